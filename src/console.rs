//! Our own console window: hidden by default, revealed when something
//! needs the user's attention.
use std::io::{BufRead, Write};
use winapi::um::wincon::GetConsoleWindow;
use winapi::um::winuser::{SW_HIDE, SW_SHOW, ShowWindow};

fn set_visible(visible: bool) {
    unsafe {
        let hwnd = GetConsoleWindow();
        if !hwnd.is_null() {
            ShowWindow(hwnd, if visible { SW_SHOW } else { SW_HIDE });
        }
    }
}

pub fn hide_console() {
    set_visible(false);
}

pub fn show_console() {
    set_visible(true);
}

/// Reveal the console and wait for Enter so a fatal message can be read.
pub fn pause_for_enter() {
    show_console();
    print!("\nPress enter to continue...");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}
