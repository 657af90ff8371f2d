mod cmd;

use std::env;
use std::process;
use std::time::Instant;

use lessify::Pager;
use log::error;

use cmd::cli;

fn main() {
    let start = Instant::now();

    let args = match cli::Args::build_from_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("fatal: {err}");
            println!("Try '{bin} -h' for help.", bin = env!("CARGO_BIN_NAME"));
            process::exit(2);
        }
    };

    init_logging(args.debug);

    if args.help {
        help();
    } else if args.version {
        version();
    } else if args.mode.is_some() {
        if let Err(err) = cmd::run(&args, start) {
            error!("{err}");
            if args.debug {
                eprintln!("{}", std::backtrace::Backtrace::force_capture());
            }
            process::exit(err.exit_code());
        }
    } else {
        help();
    }
}

fn init_logging(debug: bool) {
    let level = if debug {
        // SAFETY: single-threaded, runs once before any other thread exists.
        unsafe { env::set_var("RUST_BACKTRACE", "1") };
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            use std::io::Write as _;
            writeln!(buf, "{}", record.args())
        })
        .init();
}

fn help() {
    Pager::page_or_print(&format!(
        "\
{description}

Usage: {bin} (-e|-v|-d) -k <location> [options]

Modes (mutually exclusive, one required):
  -e, --encrypt           Encryption mode
  -v, --verify            Verification mode
  -d, --decrypt           Decryption mode

Options:
  -k, --key LOCATION      Key source; required by every mode
  -a, --after DATE_TIME   Reject streams not encrypted after this instant
                          (default: 2021-01-01T00Z)
      --debug             Raise log verbosity to debug
  -h, --help              Show this message and exit
  -V, --version           Show the version and exit

The --key LOCATION must be one of:
  env:NAME                Hex-encoded key in environment variable NAME
  file:PATH               Hex-encoded key in the file at PATH
  fd:NUMBER               Hex-encoded key on open file descriptor NUMBER

Example: {bin} -e -k file:path/to/my/secret.key < plaintext > stream
",
        description = env!("CARGO_PKG_DESCRIPTION"),
        bin = env!("CARGO_BIN_NAME"),
    ));
}

fn version() {
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
}
