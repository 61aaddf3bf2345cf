//! End-to-end behaviour of the capability surface, driven through the mock
//! backend as a `Box<dyn Platform>`.

use std::fs::File;
use std::time::{Duration, SystemTime};

use pointwarp_platform::mock::{MockHandle, MockOptions, MockPlatform, NativeCall};
use pointwarp_platform::monitor::MONITOR_CAPACITY;
use pointwarp_platform::screen::bounding_box;
use pointwarp_platform::{FileMonitor, Platform, PlatformError};
use pointwarp_types::{
    BoundingBox, Color, Hint, InputEvent, Modifiers, MouseButton, PointerPosition, Screen,
    ScreenId, ScrollDirection,
};

fn dual_head() -> Vec<Screen> {
    vec![
        Screen::new(0, -1920, 0, 1920, 1080),
        Screen::new(1, 0, 0, 1920, 1080),
    ]
}

fn platform(options: MockOptions) -> (Box<dyn Platform>, MockHandle) {
    let mock = MockPlatform::with_options(dual_head(), options).unwrap();
    let handle = mock.handle();
    (Box::new(mock), handle)
}

fn motions(handle: &MockHandle) -> Vec<(u32, u32, u32, u32)> {
    handle
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            NativeCall::Motion(m) => Some((m.x, m.y, m.x_extent, m.y_extent)),
            _ => None,
        })
        .collect()
}

#[test]
fn bounding_box_of_single_and_dual_layouts() {
    assert_eq!(
        bounding_box(&[Screen::new(0, 0, 0, 1920, 1080)]),
        Some(BoundingBox {
            min_x: 0,
            min_y: 0,
            max_x: 1920,
            max_y: 1080
        })
    );
    assert_eq!(
        bounding_box(&dual_head()),
        Some(BoundingBox {
            min_x: -1920,
            min_y: 0,
            max_x: 1920,
            max_y: 1080
        })
    );
    assert_eq!(bounding_box(&[]), None);
}

#[test]
fn moves_land_in_virtual_space() {
    let (mut p, handle) = platform(MockOptions::default());
    p.mouse_move(ScreenId(0), 100, 50).unwrap();
    p.mouse_move(ScreenId(1), 100, 50).unwrap();
    assert_eq!(
        motions(&handle),
        vec![(100, 50, 3840, 1080), (2020, 50, 3840, 1080)]
    );
    assert_eq!(
        p.mouse_get_position(),
        Some(PointerPosition {
            screen: ScreenId(1),
            x: 100,
            y: 50
        })
    );
}

#[test]
fn move_to_missing_screen_is_rejected() {
    let (mut p, handle) = platform(MockOptions::default());
    assert!(matches!(
        p.mouse_move(ScreenId(2), 0, 0),
        Err(PlatformError::UnknownScreen(ScreenId(2)))
    ));
    assert!(handle.calls().is_empty());
}

#[test]
fn position_is_unknown_before_first_move() {
    let (mut p, _) = platform(MockOptions::default());
    assert_eq!(p.mouse_get_position(), None);

    let (mut p, _) = platform(MockOptions {
        query_position: Some((50, 60)),
        ..MockOptions::default()
    });
    assert_eq!(
        p.mouse_get_position(),
        Some(PointerPosition {
            screen: ScreenId(1),
            x: 50,
            y: 60
        })
    );
}

#[test]
fn repeated_down_activates_once() {
    let (mut p, handle) = platform(MockOptions::default());
    p.mouse_down(1).unwrap();
    p.mouse_down(1).unwrap();
    assert_eq!(handle.presses(MouseButton::Left), 1);
    p.mouse_up(1).unwrap();
    p.mouse_up(1).unwrap();

    // Released twice, and nothing left to release on drop.
    handle.clear();
    drop(p);
    assert_eq!(handle.calls(), vec![NativeCall::Frame]);
}

#[test]
fn click_is_a_single_batch() {
    let (mut p, handle) = platform(MockOptions::default());
    p.mouse_click(2).unwrap();
    assert_eq!(
        handle.calls(),
        vec![
            NativeCall::Button {
                button: MouseButton::Middle,
                pressed: true
            },
            NativeCall::Button {
                button: MouseButton::Middle,
                pressed: false
            },
            NativeCall::Frame,
        ]
    );
}

#[test]
fn click_on_held_button_does_not_press_again() {
    let (mut p, handle) = platform(MockOptions::default());
    p.mouse_down(1).unwrap();
    p.mouse_click(1).unwrap();
    assert_eq!(handle.presses(MouseButton::Left), 1);

    // Nothing is held any more.
    handle.clear();
    drop(p);
    assert_eq!(handle.calls(), vec![NativeCall::Frame]);
}

#[test]
fn dropping_the_platform_releases_held_buttons() {
    let (mut p, handle) = platform(MockOptions::default());
    p.mouse_down(1).unwrap();
    p.mouse_down(3).unwrap();
    handle.clear();
    drop(p);
    assert_eq!(
        handle.calls(),
        vec![
            NativeCall::Button {
                button: MouseButton::Left,
                pressed: false
            },
            NativeCall::Button {
                button: MouseButton::Right,
                pressed: false
            },
            NativeCall::Frame,
        ]
    );
}

#[test]
fn out_of_range_button_is_fatal() {
    let (mut p, handle) = platform(MockOptions::default());
    let err = p.mouse_down(7).unwrap_err();
    assert!(matches!(err, PlatformError::InvalidButton(7)));
    assert!(err.is_fatal());
    assert!(handle.calls().is_empty());
}

#[test]
fn horizontal_scroll_may_be_unsupported() {
    let (mut p, handle) = platform(MockOptions {
        horizontal_scroll: false,
        ..MockOptions::default()
    });
    let err = p.scroll(ScrollDirection::Right).unwrap_err();
    assert!(matches!(err, PlatformError::NotSupported(_)));
    assert!(!err.is_fatal());
    assert!(handle.calls().is_empty());

    p.scroll(ScrollDirection::Up).unwrap();
    assert_eq!(
        handle.calls(),
        vec![NativeCall::Scroll(ScrollDirection::Up), NativeCall::Frame]
    );
}

#[test]
fn cursor_hiding_reports_support() {
    let (mut p, handle) = platform(MockOptions::default());
    p.mouse_hide().unwrap();
    p.mouse_show().unwrap();
    assert!(handle.calls().contains(&NativeCall::CursorVisible(false)));

    let (mut p, _) = platform(MockOptions {
        cursor_hiding: false,
        ..MockOptions::default()
    });
    assert!(matches!(p.mouse_hide(), Err(PlatformError::NotSupported(_))));
}

#[test]
fn key_names_round_trip_through_the_platform() {
    let (p, _) = platform(MockOptions::default());
    for code in 0..=u8::MAX {
        for shifted in [false, true] {
            if let Some(name) = p.input_lookup_name(code, shifted) {
                assert_eq!(p.input_lookup_code(name), Some((code, shifted)), "{name}");
            }
        }
    }
    assert_eq!(p.input_lookup_code("esc"), Some((9, false)));
    assert_eq!(p.input_lookup_name(22, false), Some("backspace"));
    assert_eq!(p.input_lookup_code("no-such-key"), None);
}

#[test]
fn input_wait_skips_unrelated_events() {
    let (mut p, handle) = platform(MockOptions::default());
    let esc = InputEvent::press(9, Modifiers::empty());
    handle.push_event(InputEvent::press(38, Modifiers::empty()));
    handle.push_event(InputEvent::press(9, Modifiers::SHIFT));
    handle.push_event(esc);

    p.input_grab_keyboard().unwrap();
    let timeout = Some(Duration::from_millis(50));
    assert_eq!(p.input_wait(&[esc], timeout).unwrap(), Some(esc));
    assert_eq!(p.input_next_event(timeout).unwrap(), None);
    p.input_ungrab_keyboard().unwrap();
    assert!(!handle.is_grabbed());
}

#[test]
fn drawing_is_recorded_per_screen() {
    let (mut p, handle) = platform(MockOptions::default());
    let red = Color::parse("#ff0000").unwrap();
    p.screen_draw_box(ScreenId(1), 10, 10, 100, 20, red).unwrap();
    p.hint_draw(
        ScreenId(0),
        &[Hint {
            x: 0,
            y: 0,
            width: 20,
            height: 20,
            label: "aa".into(),
        }],
    )
    .unwrap();
    p.screen_clear(ScreenId(1)).unwrap();
    assert_eq!(p.screen_get_dimensions(ScreenId(0)), Some((1920, 1080)));
    assert_eq!(p.screen_get_dimensions(ScreenId(5)), None);

    let calls = handle.calls();
    assert!(matches!(calls[0], NativeCall::DrawBox { screen: ScreenId(1), .. }));
    assert_eq!(
        calls[1],
        NativeCall::Hints {
            screen: ScreenId(0),
            labels: vec!["aa".to_string()]
        }
    );
    assert_eq!(calls[2], NativeCall::Clear(ScreenId(1)));
}

#[test]
fn monitored_file_change_is_reported_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "").unwrap();
    let set_mtime = |secs: u64| {
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    };
    set_mtime(100);

    let (mut p, _) = platform(MockOptions::default());
    p.monitor_file(&path).unwrap();
    assert!(p.poll_monitored_files().is_empty());

    set_mtime(200);
    assert_eq!(p.poll_monitored_files(), vec![path.clone()]);
    assert!(p.poll_monitored_files().is_empty());
}

#[test]
fn monitor_overflow_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockPlatform::new(dual_head())
        .unwrap()
        .with_monitor(FileMonitor::with_capacity(2));
    let mut p: Box<dyn Platform> = Box::new(mock);
    p.monitor_file(&dir.path().join("a")).unwrap();
    p.monitor_file(&dir.path().join("b")).unwrap();
    let err = p.monitor_file(&dir.path().join("c")).unwrap_err();
    assert!(matches!(err, PlatformError::MonitorFull { capacity: 2 }));
    assert!(err.is_fatal());
    assert_eq!(MONITOR_CAPACITY, 32);
}

#[test]
fn error_modal_is_recorded() {
    let (mut p, handle) = platform(MockOptions::default());
    p.show_error_modal("pointwarp", "could not load config");
    assert_eq!(
        handle.calls(),
        vec![NativeCall::ErrorModal {
            title: "pointwarp".into(),
            message: "could not load config".into()
        }]
    );
}
