use clap::{App, Arg, ErrorKind};
use graphcut_synthesis as gs;
use rand::Rng;
use std::time::Instant;

fn fatal(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", message);
    std::process::exit(1);
}

fn parse_size(input: &str) -> Option<gs::Dims> {
    let mut parts = input.split('x');
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(gs::Dims::new(width, height))
}

fn main() {
    env_logger::init();

    let app = App::new("graphcut")
        .version("0.1.0")
        .about("graph-cut texture synthesis")
        .arg(
            Arg::with_name("INPUT")
                .help("Path to the sample texture image")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("OUTPUT")
                .help("Path the synthesized image is written to (format by extension, e.g. out.png)")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::with_name("SIZE")
                .help("Output size as WxH, e.g. 512x512")
                .required(true)
                .index(3),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .takes_value(true)
                .help("Random seed. The same seed always reproduces the same image. Default: random"),
        )
        .arg(
            Arg::with_name("iterations")
                .long("iterations")
                .takes_value(true)
                .help("Number of refinement passes after the initial tiling. Default: 30"),
        )
        .arg(
            Arg::with_name("matching")
                .long("matching")
                .takes_value(true)
                .possible_values(&["fft", "random", "sub-patch", "blind"])
                .help("Offset search strategy for the refinement passes. Default: fft"),
        )
        .arg(
            Arg::with_name("times")
                .long("times")
                .takes_value(true)
                .help("Number of candidate offsets for the random and sub-patch strategies. Default: 100"),
        );

    let matches = match app.get_matches_safe() {
        Ok(matches) => matches,
        Err(e) => {
            // A wrong argument count is a handled outcome, not a failure:
            // show the usage and exit cleanly, like help and version do.
            let code = match e.kind {
                ErrorKind::MissingRequiredArgument
                | ErrorKind::UnknownArgument
                | ErrorKind::HelpDisplayed
                | ErrorKind::VersionDisplayed => 0,
                _ => 1,
            };
            println!("{}", e.message);
            std::process::exit(code);
        }
    };

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("OUTPUT").unwrap();
    let size = matches
        .value_of("SIZE")
        .and_then(parse_size)
        .unwrap_or_else(|| fatal("couldn't parse size (expected WxH, e.g. 512x512)"));

    let seed: u64 = match matches.value_of("seed") {
        Some(s) => s
            .parse()
            .unwrap_or_else(|_| fatal("couldn't parse seed")),
        None => rand::thread_rng().gen(),
    };
    let iterations: u32 = matches
        .value_of("iterations")
        .unwrap_or("30")
        .parse()
        .unwrap_or_else(|_| fatal("couldn't parse iterations"));
    let times: u32 = matches
        .value_of("times")
        .unwrap_or("100")
        .parse()
        .unwrap_or_else(|_| fatal("couldn't parse times"));

    let matching = match matches.value_of("matching").unwrap_or("fft") {
        "fft" => gs::Matching::EntireFft,
        "random" => gs::Matching::EntireRandom { times },
        "sub-patch" => gs::Matching::SubPatch { times },
        "blind" => gs::Matching::Random,
        other => fatal(format!("unknown matching strategy '{}'", other)),
    };

    let session = gs::Session::builder()
        .load_texture(&input)
        .output_size(size)
        .seed(seed)
        .iterations(iterations)
        .matching(matching)
        .build()
        .unwrap_or_else(|e| fatal(e));

    let progress: Box<dyn gs::SynthesisProgress> = Box::new(|update: gs::ProgressUpdate<'_>| {
        log::debug!(
            "refinement pass {}/{}",
            update.total.current,
            update.total.total
        );
    });

    let start = Instant::now();
    let generated = session.run(Some(progress)).unwrap_or_else(|e| fatal(e));
    println!(
        "synthesized {}x{} from {} in {:.3} s (seed {})",
        size.width,
        size.height,
        input,
        start.elapsed().as_secs_f64(),
        seed
    );

    generated.save(output).unwrap_or_else(|e| fatal(e));
}
