use super::{
    APP_PIE_TITLE, CATEGORY_PIE_TITLE, LOG_EXTENSION, TIMELINE_TITLE, VERSION,
};
use crate::utils::sanitize_filename;
use clap::{value_parser, Arg, ArgAction, Command};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::process;

/// Takes the CLI arguments that locate the privacy report and control the display.
/// The directory can be safely unwrapped, it has a default.
pub fn parse_cli() -> (String, PathBuf, bool, bool) {
    let arg_name = Arg::new("name")
        .help("base name of the exported report, without the .ndjson extension")
        .short('n')
        .long("name")
        .num_args(1)
        .required(true);
    let arg_dir = Arg::new("dir")
        .help("directory with the report; the figures are saved there too")
        .short('d')
        .long("dir")
        .num_args(1)
        .value_parser(value_parser!(PathBuf))
        .default_value(".");
    let arg_show = Arg::new("show")
        .help("open the saved figures in the image viewer")
        .short('s')
        .long("show")
        .action(ArgAction::SetTrue);
    let arg_verbose = Arg::new("verbose")
        .help("print verbose information")
        .short('v')
        .long("verbose")
        .action(ArgAction::SetTrue);
    let cli_args = Command::new("Privacy_plot")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to plot the app privacy report: access timelapse and pie charts")
        .arg(arg_name)
        .arg(arg_dir)
        .arg(arg_show)
        .arg(arg_verbose)
        .get_matches();
    let name: String = cli_args.get_one::<String>("name").unwrap().to_owned();
    let dir: PathBuf = cli_args.get_one::<PathBuf>("dir").unwrap().to_owned();
    let show = cli_args.get_flag("show");
    let verbose = cli_args.get_flag("verbose");
    (name, dir, show, verbose)
}

/// Path of the report: `<dir>/<name>.ndjson`.
pub fn data_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, LOG_EXTENSION))
}

/// Titles of the timeline, category pie, and app pie.
pub fn figure_titles(name: &str) -> (String, String, String) {
    (
        format!("{} {}", name, TIMELINE_TITLE),
        format!("{} {}", name, CATEGORY_PIE_TITLE),
        format!("{} {}", name, APP_PIE_TITLE),
    )
}

/// Image path for a figure: the sanitized title as png, next to the report.
pub fn output_path(data_file: &Path, title: &str) -> PathBuf {
    let fname = format!("{}.png", sanitize_filename(title));
    match data_file.parent() {
        Some(dir) => dir.join(fname),
        None => PathBuf::from(fname),
    }
}

/// Open each figure with the system viewer and wait for it.
/// A viewer that cannot be started is reported, the figures are already saved.
pub fn show_figures(figures: &[PathBuf]) {
    for fig in figures {
        debug!("open {}", fig.display());
        match viewer_command(fig).status() {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("viewer for {} exited with {}", fig.display(), status),
            Err(e) => warn!("could not open {}: {}", fig.display(), e),
        }
    }
}

fn viewer_command(fig: &Path) -> process::Command {
    if cfg!(target_os = "macos") {
        let mut cmd = process::Command::new("open");
        cmd.arg("-W").arg(fig);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = process::Command::new("cmd");
        cmd.args(["/C", "start", "/WAIT", ""]).arg(fig);
        cmd
    } else {
        let mut cmd = process::Command::new("xdg-open");
        cmd.arg(fig);
        cmd
    }
}
