use std::path::PathBuf;

use gif_tui::ui::Outcome;

enum Command {
    Exit,
    Run(gif_tui::RunOptions),
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Exit) => return,
        Ok(Command::Run(options)) => options,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    match gif_tui::run(options) {
        Ok(Outcome::Selected(selection)) => println!("{}", selection.locator),
        Ok(Outcome::Cancelled) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err:?}");
            std::process::exit(1);
        }
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command, String> {
    let mut options = gif_tui::RunOptions::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("GIF-TUI {}", gif_tui::VERSION);
                return Ok(Command::Exit);
            }
            "--help" | "-h" => {
                println!(
                    "GIF-TUI - Pick a GIF from GIPHY's trending and search feeds.\n\nPrints the chosen rendition's URL on stdout; exits 1 when cancelled.\n\n  --config <path>      Read configuration from <path>\n  --demo               Browse generated GIFs without network access\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message"
                );
                return Ok(Command::Exit);
            }
            "--demo" => options.demo = true,
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                options.config_file = Some(PathBuf::from(path));
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(Command::Run(options))
}
