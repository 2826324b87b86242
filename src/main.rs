use anyhow::Result;
use renewd::cli::{App, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();
    let app = App::new(&args).await?;

    app.run(args.command).await?;

    Ok(())
}
