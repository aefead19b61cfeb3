fn main() -> anyhow::Result<()> {
    brrtrouter_dispatch::cli::run_cli()
}
