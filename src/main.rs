fn main() {
    if let Err(err) = posemirror_lib::run() {
        log::error!("PoseMirror failed: {err:?}");
        std::process::exit(1);
    }
}
