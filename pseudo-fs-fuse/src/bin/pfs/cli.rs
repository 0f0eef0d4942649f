use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
pub struct Cli {
    /// Filesystem image to operate on
    #[arg(long, short)]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create (or overwrite) the image with a size such as `600MB`
    Format {
        size: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        signature: Option<String>,
    },
    #[command(flatten)]
    Image(ImageCommand),
}

/// Commands run against an existing image.
#[derive(Debug, Subcommand)]
pub enum ImageCommand {
    Mkdir {
        path: String,
    },
    Rmdir {
        path: String,
    },
    Rm {
        path: String,
    },
    Cp {
        src: String,
        dst: String,
    },
    Mv {
        src: String,
        dst: String,
    },
    /// Store `first` followed by `second` in the new file `dst`
    Xcp {
        first: String,
        second: String,
        dst: String,
    },
    /// Append the content of `src` to `dst`
    Add {
        dst: String,
        src: String,
    },
    /// Copy a host file into the image
    Incp {
        host: PathBuf,
        path: String,
    },
    /// Copy an image file out to the host
    Outcp {
        path: String,
        host: PathBuf,
    },
    Cat {
        path: String,
    },
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    Info {
        path: String,
    },
    Statfs,
    /// Import every regular file of a host directory
    Pack {
        /// Host source directory
        #[arg(long, short)]
        source: PathBuf,

        /// Image directory, created when missing
        #[arg(long, short, default_value = "/")]
        target: String,
    },
}
