//! macOS virtual keycode to key-name mapping (ANSI layout).
//!
//! Printable keys map to their unshifted character; everything else maps to
//! a lower-case symbolic name. Unknown codes fall back to `key_<code>` so no
//! observation is ever dropped for lack of a table entry.

/// Name for a macOS virtual keycode.
pub fn key_name(keycode: i64) -> String {
    match keycode {
        0 => "a",
        1 => "s",
        2 => "d",
        3 => "f",
        4 => "h",
        5 => "g",
        6 => "z",
        7 => "x",
        8 => "c",
        9 => "v",
        11 => "b",
        12 => "q",
        13 => "w",
        14 => "e",
        15 => "r",
        16 => "y",
        17 => "t",
        18 => "1",
        19 => "2",
        20 => "3",
        21 => "4",
        22 => "6",
        23 => "5",
        24 => "=",
        25 => "9",
        26 => "7",
        27 => "-",
        28 => "8",
        29 => "0",
        30 => "]",
        31 => "o",
        32 => "u",
        33 => "[",
        34 => "i",
        35 => "p",
        37 => "l",
        38 => "j",
        39 => "'",
        40 => "k",
        41 => ";",
        42 => "\\",
        43 => ",",
        44 => "/",
        45 => "n",
        46 => "m",
        47 => ".",
        50 => "`",

        36 => "return",
        48 => "tab",
        49 => "space",
        51 => "delete",
        53 => "escape",
        54 => "right_cmd",
        55 => "cmd",
        56 => "shift",
        57 => "caps_lock",
        58 => "option",
        59 => "control",
        60 => "right_shift",
        61 => "right_option",
        62 => "right_control",
        63 => "fn",
        76 => "enter",
        96 => "f5",
        97 => "f6",
        98 => "f7",
        99 => "f3",
        100 => "f8",
        101 => "f9",
        103 => "f11",
        109 => "f10",
        111 => "f12",
        114 => "help",
        115 => "home",
        116 => "page_up",
        117 => "forward_delete",
        118 => "f4",
        119 => "end",
        120 => "f2",
        121 => "page_down",
        122 => "f1",
        123 => "left",
        124 => "right",
        125 => "down",
        126 => "up",

        other => return format!("key_{other}"),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters() {
        assert_eq!(key_name(0), "a");
        assert_eq!(key_name(12), "q");
        assert_eq!(key_name(46), "m");
    }

    #[test]
    fn test_digits() {
        assert_eq!(key_name(18), "1");
        assert_eq!(key_name(29), "0");
        // 22/23 are swapped relative to their neighbors on purpose
        assert_eq!(key_name(22), "6");
        assert_eq!(key_name(23), "5");
    }

    #[test]
    fn test_symbolic_names() {
        assert_eq!(key_name(36), "return");
        assert_eq!(key_name(49), "space");
        assert_eq!(key_name(53), "escape");
        assert_eq!(key_name(55), "cmd");
        assert_eq!(key_name(126), "up");
    }

    #[test]
    fn test_unknown_code_fallback() {
        assert_eq!(key_name(200), "key_200");
        assert_eq!(key_name(-1), "key_-1");
    }
}
