use clap::Parser;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("BUILD_YEAR"),
    "-",
    env!("BUILD_MONTH"),
    "-",
    env!("BUILD_DAY"),
    ")"
);

/// Watch for Spotify.exe starts and nudge the main window so its taskbar
/// thumbnail repaints.
#[derive(Parser, Default, Clone, Debug, PartialEq, Eq)]
#[command(name = "spotify-taskbar-fix", version, long_version = LONG_VERSION)]
pub struct CommandLineOptions {
    /// Keep the console window visible and print progress lines
    #[arg(short = 'w', long = "show-console")]
    pub show_console: bool,
}

impl std::fmt::Display for CommandLineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CommandLineOptions {{
    show_console: {}
}}",
            self.show_console
        )
    }
}

pub fn parse_command_line() -> CommandLineOptions {
    CommandLineOptions::parse()
}
