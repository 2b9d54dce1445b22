fn main() -> gategen::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    gategen::cli::run()
}
