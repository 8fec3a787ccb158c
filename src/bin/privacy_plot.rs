use anyhow::Context;
use log::info;
use privacy_lpp::generate_report;
use privacy_lpp::privacy_plot::{data_file, parse_cli, show_figures};

fn main() -> anyhow::Result<()> {
    let (name, dir, show, verbose) = parse_cli();

    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let fin = data_file(&dir, &name);
    if verbose {
        info!("name {}", name);
        info!("dir {:?}", dir);
        info!("show {}", show);
    }

    let figures = generate_report(&fin, &name)
        .with_context(|| format!("could not build the report for {}", fin.display()))?;
    for fig in figures.iter() {
        info!("> saved {}", fig.display());
    }

    if show {
        show_figures(&figures);
    }
    Ok(())
}
