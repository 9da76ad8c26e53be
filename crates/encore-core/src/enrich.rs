//! Best-effort heuristic annotations layered on top of a loaded event log.

use crate::model::{CapturedEvent, EventKind, MouseButton};

/// Hint attached to a key press that immediately follows a pressed
/// left-button click.
pub const FOLLOWUP_HINT: &str = "possible_internet_research_input";

/// Tag each `key_press` whose immediate predecessor is a pressed left-button
/// `mouse_click` with [`FOLLOWUP_HINT`]. A weak signal that the user clicked
/// into a text field (often a browser search box) and started typing.
///
/// This is annotation only — nothing downstream may rely on it for
/// correctness, and it can be disabled via `capture.followup_tagging`.
pub fn tag_followup_keys(events: &mut [CapturedEvent]) {
    for i in 1..events.len() {
        let prev_is_left_down = matches!(
            events[i - 1].kind,
            EventKind::MouseClick {
                button: MouseButton::Left,
                pressed: true,
                ..
            }
        );
        if !prev_is_left_down {
            continue;
        }
        if let EventKind::KeyPress { ref mut context, .. } = events[i].kind {
            if context.is_none() {
                *context = Some(FOLLOWUP_HINT.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn left_click(pressed: bool) -> CapturedEvent {
        CapturedEvent::now(EventKind::MouseClick {
            x: 100.0,
            y: 200.0,
            button: MouseButton::Left,
            pressed,
        })
    }

    fn right_click() -> CapturedEvent {
        CapturedEvent::now(EventKind::MouseClick {
            x: 100.0,
            y: 200.0,
            button: MouseButton::Right,
            pressed: true,
        })
    }

    fn key_press(key: &str) -> CapturedEvent {
        CapturedEvent::now(EventKind::KeyPress {
            key: key.into(),
            context: None,
        })
    }

    fn context_of(event: &CapturedEvent) -> Option<&str> {
        match &event.kind {
            EventKind::KeyPress { context, .. } => context.as_deref(),
            _ => None,
        }
    }

    #[test]
    fn test_key_after_left_down_gets_hint() {
        let mut events = vec![left_click(true), key_press("a")];
        tag_followup_keys(&mut events);
        assert_eq!(context_of(&events[1]), Some(FOLLOWUP_HINT));
    }

    #[test]
    fn test_key_after_left_release_untouched() {
        let mut events = vec![left_click(false), key_press("a")];
        tag_followup_keys(&mut events);
        assert_eq!(context_of(&events[1]), None);
    }

    #[test]
    fn test_key_after_right_click_untouched() {
        let mut events = vec![right_click(), key_press("a")];
        tag_followup_keys(&mut events);
        assert_eq!(context_of(&events[1]), None);
    }

    #[test]
    fn test_only_immediate_successor_tagged() {
        let mut events = vec![left_click(true), key_press("a"), key_press("b")];
        tag_followup_keys(&mut events);
        assert_eq!(context_of(&events[1]), Some(FOLLOWUP_HINT));
        assert_eq!(context_of(&events[2]), None);
    }

    #[test]
    fn test_existing_context_preserved() {
        let mut events = vec![
            left_click(true),
            CapturedEvent::now(EventKind::KeyPress {
                key: "a".into(),
                context: Some("already-tagged".into()),
            }),
        ];
        tag_followup_keys(&mut events);
        assert_eq!(context_of(&events[1]), Some("already-tagged"));
    }

    #[test]
    fn test_empty_and_single_event_logs() {
        let mut empty: Vec<CapturedEvent> = Vec::new();
        tag_followup_keys(&mut empty);
        let mut single = vec![key_press("a")];
        tag_followup_keys(&mut single);
        assert_eq!(context_of(&single[0]), None);
    }
}
