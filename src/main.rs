fn main() -> miette::Result<()> {
    riff::cli::run()
}
