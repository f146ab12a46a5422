use clap::Parser;

fn main() -> menuparse::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = menuparse::Args::parse();

    let mut stdout = std::io::stdout().lock();
    menuparse::run(&mut stdout, args)
}
