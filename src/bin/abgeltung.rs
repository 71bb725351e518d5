fn main() {
    abgeltung::cmd::command_main();
}
