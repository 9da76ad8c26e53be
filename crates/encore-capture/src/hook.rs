//! The system input hook. On macOS this is a listen-only CGEventTap pumping
//! a CFRunLoop; elsewhere capture is unsupported and the worker simply
//! waits for the shutdown request so controller flows stay testable.

use encore_core::store::EventStore;

#[cfg(target_os = "macos")]
pub fn run(store: EventStore) -> anyhow::Result<()> {
    macos::run(store)
}

#[cfg(not(target_os = "macos"))]
pub fn run(_store: EventStore) -> anyhow::Result<()> {
    tracing::warn!("input capture is only supported on macOS; recording nothing");
    crate::wait_for_shutdown_request();
    Ok(())
}

#[cfg(target_os = "macos")]
mod macos {
    use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
    use core_graphics::event::{
        CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    };
    use encore_core::context::{classify, current_context};
    use encore_core::model::{CapturedEvent, EventKind, MouseButton};
    use encore_core::store::EventStore;

    use crate::keymap::key_name;

    // CGEventField indexes, hardcoded to avoid crate version mismatches:
    // kCGKeyboardEventKeycode = 9, scroll wheel point deltas = 96/97.
    const KEYCODE_FIELD: u32 = 9;
    const SCROLL_POINT_DELTA_AXIS_1: u32 = 96;
    const SCROLL_POINT_DELTA_AXIS_2: u32 = 97;

    pub fn run(store: EventStore) -> anyhow::Result<()> {
        // Shutdown watcher: the tap blocks this thread in the run loop, so
        // EOF detection lives on its own thread and ends the process.
        std::thread::spawn(|| {
            crate::wait_for_shutdown_request();
            std::process::exit(0);
        });

        let events = vec![
            CGEventType::LeftMouseDown,
            CGEventType::LeftMouseUp,
            CGEventType::RightMouseDown,
            CGEventType::RightMouseUp,
            CGEventType::ScrollWheel,
            CGEventType::KeyDown,
            CGEventType::KeyUp,
        ];

        let tap = CGEventTap::new(
            CGEventTapLocation::HID,
            CGEventTapPlacement::HeadInsertEventTap,
            CGEventTapOptions::ListenOnly,
            events,
            move |_proxy, event_type, event| {
                let kind = match event_type {
                    CGEventType::LeftMouseDown | CGEventType::LeftMouseUp => {
                        let loc = event.location();
                        EventKind::MouseClick {
                            x: loc.x,
                            y: loc.y,
                            button: MouseButton::Left,
                            pressed: matches!(event_type, CGEventType::LeftMouseDown),
                        }
                    }
                    CGEventType::RightMouseDown | CGEventType::RightMouseUp => {
                        let loc = event.location();
                        EventKind::MouseClick {
                            x: loc.x,
                            y: loc.y,
                            button: MouseButton::Right,
                            pressed: matches!(event_type, CGEventType::RightMouseDown),
                        }
                    }
                    CGEventType::ScrollWheel => {
                        let loc = event.location();
                        EventKind::MouseScroll {
                            x: loc.x,
                            y: loc.y,
                            dx: event.get_integer_value_field(SCROLL_POINT_DELTA_AXIS_2) as f64,
                            dy: event.get_integer_value_field(SCROLL_POINT_DELTA_AXIS_1) as f64,
                        }
                    }
                    CGEventType::KeyDown => EventKind::KeyPress {
                        key: key_name(event.get_integer_value_field(KEYCODE_FIELD)),
                        context: None,
                    },
                    CGEventType::KeyUp => EventKind::KeyRelease {
                        key: key_name(event.get_integer_value_field(KEYCODE_FIELD)),
                    },
                    _ => return Some(event.to_owned()),
                };

                record(&store, kind);
                Some(event.to_owned())
            },
        )
        .map_err(|_| {
            anyhow::anyhow!(
                "failed to create event tap; is Accessibility permission granted?"
            )
        })?;

        let source = tap
            .mach_port
            .create_runloop_source(0)
            .map_err(|_| anyhow::anyhow!("failed to create run loop source"))?;
        let run_loop = CFRunLoop::get_current();
        run_loop.add_source(&source, unsafe { kCFRunLoopCommonModes });
        tap.enable();

        tracing::info!("event tap running");
        CFRunLoop::run_current();
        Ok(())
    }

    /// Enrich one observation with foreground context and append it. Store
    /// failures are logged, never fatal — losing one event must not take
    /// down the session.
    fn record(store: &EventStore, kind: EventKind) {
        let mut event = CapturedEvent::now(kind);
        let (app, window) = current_context();
        event.category = Some(classify(app.as_deref()));
        event.app = app;
        event.window = window;

        if let Err(e) = store.append(&event) {
            tracing::warn!("failed to append {} event: {e}", event.kind.label());
        }
    }
}
