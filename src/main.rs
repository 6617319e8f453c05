fn main() -> anyhow::Result<()> {
    resume_labeler_lib::run()
}
