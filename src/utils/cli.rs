use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Parser)]
pub enum Command {
    #[command(name = "resolve")]
    Resolve {
        /// Directory holding `<id>.<ext>` resources
        #[arg(short, long)]
        resources: PathBuf,

        /// Resource ids to resolve (repeatable)
        #[arg(short, long = "id", required = true)]
        ids: Vec<u32>,

        /// Resize to WxH before caching
        #[arg(long)]
        resize: Option<String>,

        /// Scaling mode (fill, fit, stretch)
        #[arg(short, long, default_value = "fill")]
        scaling: String,

        /// Shape size WxH applied when displaying
        #[arg(long)]
        shape_size: Option<String>,

        /// Round the corners by this radius
        #[arg(long, conflicts_with = "circle")]
        radius: Option<u32>,

        /// Clip to a circle
        #[arg(long)]
        circle: bool,

        /// Use RGB_565 buffers
        #[arg(long)]
        low_quality: bool,

        /// Resolve the ids this many times
        #[arg(long, default_value_t = 1)]
        repeat: u32,

        /// Directory to write `<id>.png` results into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Memory cache budget in MiB
        #[arg(long, default_value_t = 64)]
        memory_cache_mb: u64,

        /// Bitmap pool budget in MiB
        #[arg(long, default_value_t = 32)]
        bitmap_pool_mb: u64,
    },

    #[command(name = "match")]
    Match {
        /// Image uri to resolve
        uri: String,

        /// Directory holding `<id>.<ext>` resources
        #[arg(short, long)]
        resources: Option<PathBuf>,

        /// Directory backing asset:// uris
        #[arg(short, long)]
        assets: Option<PathBuf>,
    },
}

const MIB: u64 = 1024 * 1024;

pub fn mib_to_bytes(mib: u64) -> u64 {
    mib.saturating_mul(MIB)
}
