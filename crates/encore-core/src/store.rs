use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::CapturedEvent;

/// Append-only JSONL store for one capture session's events.
///
/// The worker process appends; the controller reads the file back after the
/// worker exits. The file is the only channel between the two processes, so
/// every append is flushed before returning.
pub struct EventStore {
    path: PathBuf,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably append one event (creates file + parent dir if needed).
    pub fn append(&self, event: &CapturedEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }

    /// Read all events back, in write order. A missing or empty file yields
    /// an empty sequence; malformed lines (e.g. a torn trailing write) are
    /// skipped, never fatal.
    pub fn load_all(&self) -> Result<Vec<CapturedEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)?;
        let reader = std::io::BufReader::new(file);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CapturedEvent>(&line) {
                Ok(event) => events.push(event),
                Err(e) => tracing::debug!("skipping malformed event line: {e}"),
            }
        }
        Ok(events)
    }

    /// Remove the backing file.
    pub fn delete(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventKind, MouseButton};

    fn temp_store(name: &str) -> (tempfile::TempDir, EventStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = EventStore::new(dir.path().join(format!("{name}.jsonl")));
        (dir, store)
    }

    fn click(x: f64, y: f64) -> CapturedEvent {
        CapturedEvent::now(EventKind::MouseClick {
            x,
            y,
            button: MouseButton::Left,
            pressed: true,
        })
    }

    #[test]
    fn test_append_then_load_roundtrip() {
        let (_dir, store) = temp_store("roundtrip");
        let events = vec![
            click(10.0, 20.0),
            CapturedEvent::now(EventKind::KeyPress {
                key: "a".into(),
                context: None,
            }),
            CapturedEvent::now(EventKind::MouseScroll {
                x: 5.0,
                y: 6.0,
                dx: 0.0,
                dy: -3.0,
            }),
        ];
        for e in &events {
            store.append(e).unwrap();
        }
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, events);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let (_dir, store) = temp_store("missing");
        let events = store.load_all().unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_load_skips_malformed_trailing_line() {
        let (_dir, store) = temp_store("torn");
        store.append(&click(1.0, 2.0)).unwrap();
        store.append(&click(3.0, 4.0)).unwrap();
        // Simulate a torn write from a killed worker
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(store.path())
            .unwrap();
        write!(file, "{{\"kind\":\"mouse_cl").unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_load_preserves_fields_from_raw_lines() {
        let (_dir, store) = temp_store("raw");
        std::fs::write(
            store.path(),
            concat!(
                r#"{"kind":"mouse_click","x":10.0,"y":20.0,"button":"left","pressed":true,"timestamp":"2025-06-27T14:34:43.000001"}"#,
                "\n",
                r#"{"kind":"key_press","key":"a","timestamp":"2025-06-27T14:34:43.000002"}"#,
                "\n",
            ),
        )
        .unwrap();
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(matches!(
            loaded[0].kind,
            EventKind::MouseClick {
                button: MouseButton::Left,
                pressed: true,
                ..
            }
        ));
        assert!(matches!(&loaded[1].kind, EventKind::KeyPress { key, .. } if key == "a"));
        assert_eq!(loaded[0].timestamp, "2025-06-27T14:34:43.000001");
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = temp_store("delete");
        store.append(&click(0.0, 0.0)).unwrap();
        assert!(store.path().exists());
        store.delete().unwrap();
        assert!(!store.path().exists());
        // Re-entrant delete is fine
        store.delete().unwrap();
    }
}
