use clap::Parser;

fn main() {
    let cli = nagios2mantis::Cli::parse();
    cli_common::init_logging(&cli.log_args);

    match cli_common::run_cli_main(cli, |cli| {
        // Alerts are reconciled one after another, so a single thread suffices.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        runtime.block_on(cli.run())
    }) {}
}
