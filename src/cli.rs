use clap::{Parser, ValueEnum};
use log::LevelFilter;

/// Custom enum for log levels that can be used with clap's ValueEnum
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convert our custom LogLevel enum to log crate's LevelFilter
impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Command line arguments structure using clap derive macros
#[derive(Parser)]
#[command(name = "octray")]
#[command(about = "An octree-accelerated CPU path tracer")]
pub struct Args {
    /// Set the logging level (defaults to "info")
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub debug_level: LogLevel,

    /// Image width in pixels
    #[arg(long, default_value = "800", help = "Image width in pixels")]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value = "600", help = "Image height in pixels")]
    pub height: u32,

    /// Number of accumulated frames (one jittered sample per pixel each)
    #[arg(
        long,
        short = 'f',
        default_value = "64",
        help = "Number of accumulated frames"
    )]
    pub frames: u32,

    /// Bounce budget per ray
    #[arg(long, default_value = "8", help = "Maximum surface bounces per ray")]
    pub bounces: u32,

    /// Inverse-square light attenuation coefficient
    #[arg(
        long,
        default_value = "0.25",
        help = "Inverse-square light attenuation coefficient"
    )]
    pub attenuation: f32,

    /// Turn the camera by this many degrees before rendering
    #[arg(long, default_value = "0", help = "Camera yaw in degrees")]
    pub yaw: f32,

    /// Send each accumulated frame to TEV for live viewing
    #[arg(long, help = "Send each accumulated frame to TEV for live viewing")]
    pub tev: bool,

    /// TEV client IP address and port (automatically enables --tev)
    #[arg(
        long,
        help = "TEV client IP address and port (automatically enables --tev)"
    )]
    pub tev_address: Option<String>,

    /// Output file path (.png for 8-bit with gamma correction, .exr for HDR linear)
    #[arg(
        short,
        long,
        default_value = "output.png",
        help = "Output file path (.png for 8-bit with gamma correction, .exr for HDR linear)"
    )]
    pub output: String,
}
