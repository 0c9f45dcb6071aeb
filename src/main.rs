use anyhow::Context as _;
use std::{
    fs,
    io::{self, Read as _, Write as _},
    time::Instant,
};
use trac_wiki::{Config, Wiki};

/// What to render.
#[derive(Debug)]
enum Mode {
    /// A complete document.
    Document,
    /// A single line.
    Inline { shorten: bool },
    /// An outline of the headings within a depth window.
    Outline { min_depth: usize, max_depth: usize },
}

fn usage<T>(err: &'static str) -> anyhow::Result<T> {
    let exe = std::env::args().next().unwrap_or_default();
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("Usage: {exe} [options] [input.txt]\n");
    println!("Reads wiki text from the input file, or stdin if none is given, and");
    println!("writes HTML to stdout.\n");
    println!("Options:");
    println!("    --config <file.json>: Site configuration");
    println!("    --inline: Render a single line with no block structure");
    println!("    --shorten: With --inline, shorten the output");
    println!("    --outline: Render an outline of the headings");
    println!("    --depth <min[-max]>: With --outline, the heading levels to include (default: 1-6)\n");
    Err(anyhow::Error::msg(err))
}

/// Parses `N` or `N-M`.
fn depth_range(value: &str) -> Result<(usize, usize), std::num::ParseIntError> {
    Ok(match value.split_once('-') {
        Some((min, max)) => (min.trim().parse()?, max.trim().parse()?),
        None => {
            let depth = value.trim().parse()?;
            (depth, depth)
        }
    })
}

fn read_input(path: Option<&str>) -> anyhow::Result<String> {
    if let Some(path) = path {
        fs::read_to_string(path).with_context(|| format!("could not read '{path}'"))
    } else {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));

    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        return usage("Help requested");
    }

    let config = args.opt_value_from_str::<_, String>("--config")?;
    let inline = args.contains("--inline");
    let shorten = args.contains("--shorten");
    let outline = args.contains("--outline");
    let depth = args.opt_value_from_fn("--depth", depth_range)?;
    let _ = args.contains("--");
    let input = args.opt_free_from_str::<String>()?;

    if !args.finish().is_empty() {
        return usage("Unknown extra arguments passed");
    }

    let mode = match (inline, outline) {
        (true, true) => return usage("--inline and --outline cannot be combined"),
        (true, false) => Mode::Inline { shorten },
        (false, true) => {
            let (min_depth, max_depth) = depth.unwrap_or((1, 6));
            Mode::Outline {
                min_depth,
                max_depth,
            }
        }
        (false, false) => Mode::Document,
    };

    let config = if let Some(path) = config {
        let json =
            fs::read_to_string(&path).with_context(|| format!("could not read config '{path}'"))?;
        Config::from_json(&json).with_context(|| format!("invalid config '{path}'"))?
    } else {
        Config::default()
    };

    let text = read_input(input.as_deref())?;
    let wiki = Wiki::new(config)?;

    let time = Instant::now();
    let html = match mode {
        Mode::Document => wiki.to_html(&text)?,
        Mode::Inline { shorten } => wiki.to_oneliner(&text, shorten)?,
        Mode::Outline {
            min_depth,
            max_depth,
        } => wiki.to_outline(&text, min_depth, max_depth)?,
    };
    log::info!("Rendered {} bytes in {:.2?}", text.len(), time.elapsed());

    let mut stdout = io::stdout().lock();
    stdout.write_all(html.as_bytes())?;
    if !html.ends_with('\n') {
        writeln!(stdout)?;
    }
    Ok(())
}
