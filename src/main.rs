fn main() {
    #[cfg(feature = "cli")]
    textrle::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("textrle: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
