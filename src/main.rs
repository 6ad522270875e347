fn main() -> anyhow::Result<()> {
    gl_static_patcher::run_cli()
}
