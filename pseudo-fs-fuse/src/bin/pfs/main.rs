mod cli;

use std::process::ExitCode;

use clap::Parser;
use pseudo_fs::{format_image, open_image, Disk, FormatOptions, FsError, PseudoFileSystem, Result};
use pseudo_fs_fuse::{
    export_host, import_host, pack, render_info, render_list, render_statfs, status_token, Lookup,
};

use self::cli::{Cli, Command, ImageCommand};

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    log::info!("image={:?}", cli.image);

    let lookup = match cli.command {
        Command::Format { .. }
        | Command::Image(
            ImageCommand::Mkdir { .. }
            | ImageCommand::Ls { .. }
            | ImageCommand::Incp { .. }
            | ImageCommand::Pack { .. },
        ) => Lookup::Path,
        Command::Image(ImageCommand::Xcp { .. } | ImageCommand::Add { .. }) => Lookup::Content,
        Command::Image(_) => Lookup::File,
    };

    match run(cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err}");
            println!("{}", status_token(&err, lookup));
            ExitCode::FAILURE
        }
    }
}

fn ok<T>(_: T) -> String {
    String::from("OK\n")
}

fn run(cli: Cli) -> Result<String> {
    match cli.command {
        Command::Format {
            size,
            label,
            signature,
        } => {
            let defaults = FormatOptions::default();
            let options = FormatOptions {
                signature: signature.unwrap_or(defaults.signature),
                label: label.unwrap_or(defaults.label),
            };
            format_image(&cli.image, &size, &options).map(ok)
        }
        Command::Image(command) => {
            let fs = open_image(&cli.image)?;
            let output = execute(&fs, command)?;
            fs.sync()?;
            Ok(output)
        }
    }
}

fn execute<D: Disk>(fs: &PseudoFileSystem<D>, command: ImageCommand) -> Result<String> {
    let output = match command {
        ImageCommand::Mkdir { path } => fs.make_directory(&path).map(ok)?,
        ImageCommand::Rmdir { path } => fs.remove_directory(&path).map(ok)?,
        ImageCommand::Rm { path } => fs.remove_file(&path).map(ok)?,
        ImageCommand::Cp { src, dst } => fs.copy(&src, &dst).map(ok)?,
        ImageCommand::Mv { src, dst } => fs.rename(&src, &dst).map(ok)?,
        ImageCommand::Xcp { first, second, dst } => {
            fs.concatenate(&first, &second, &dst).map(ok)?
        }
        ImageCommand::Add { dst, src } => fs.append(&dst, &src).map(ok)?,
        ImageCommand::Incp { host, path } => import_host(fs, host, &path).map(ok)?,
        ImageCommand::Outcp { path, host } => export_host(fs, &path, host).map(ok)?,
        ImageCommand::Cat { path } => {
            let content = fs.read_file(&path)?;
            format!("{}\n", String::from_utf8_lossy(&content))
        }
        ImageCommand::Ls { path } => render_list(&fs.list(&path)?),
        ImageCommand::Info { path } => {
            let stat = fs.stat(&path)?;
            let name = path
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .unwrap_or("/");
            render_info(name, &stat)
        }
        ImageCommand::Statfs => render_statfs(&fs.statfs()?),
        ImageCommand::Pack { source, target } => {
            match fs.resolve(&target) {
                Err(FsError::NotFound) => {
                    fs.make_directory(&target)?;
                }
                other => {
                    other?;
                }
            }
            let packed = pack(fs, source, &target)?;
            log::info!("packed {} files into {target:?}", packed.len());
            ok(packed)
        }
    };

    Ok(output)
}
