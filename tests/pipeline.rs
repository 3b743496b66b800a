use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tiny_shell::Interpreter;
use tiny_shell::command::PipelineSpec;
use tiny_shell::env::Environment;
use tiny_shell::pipeline;

struct Workspace {
    dir: TempDir,
    fifo: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fifo = dir.path().join("channel");
        mkfifo(fifo.as_path(), Mode::S_IRUSR | Mode::S_IWUSR).unwrap();
        Self { dir, fifo }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes a shell script and returns the `sh <script>` invocation for it.
    fn script(&self, name: &str, body: &str) -> String {
        let path = self.path(name);
        fs::write(&path, body).unwrap();
        format!("sh {}", path.display())
    }

    fn spec(&self, line: &str) -> PipelineSpec {
        PipelineSpec::parse(line, Some(self.fifo.as_path())).unwrap()
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn upstream_output_reaches_downstream() {
    let ws = Workspace::new();
    let out = ws.path("out");
    let sink = ws.script("sink.sh", &format!("cat > {}\n", out.display()));

    let result = pipeline::launch(&ws.spec(&format!("echo hi | {}", sink))).unwrap();

    assert_eq!(result.exit_code(), 0);
    assert_eq!(read(&out), "hi\n");
}

#[test]
fn large_output_keeps_order() {
    let ws = Workspace::new();
    let out = ws.path("out");
    let sink = ws.script("sink.sh", &format!("cat > {}\n", out.display()));

    pipeline::launch(&ws.spec(&format!("seq 1 5000 | {}", sink))).unwrap();

    let expected: String = (1..=5000).map(|i| format!("{}\n", i)).collect();
    assert_eq!(read(&out), expected);
}

#[test]
fn slow_upstream_finishes_before_launch_returns() {
    let ws = Workspace::new();
    let marker = ws.path("marker");
    let source = ws.script(
        "source.sh",
        &format!("sleep 0.3\necho payload\necho done > {}\n", marker.display()),
    );
    let sink = ws.script("sink.sh", "cat > /dev/null\n");

    pipeline::launch(&ws.spec(&format!("{} | {}", source, sink))).unwrap();

    assert_eq!(read(&marker), "done\n");
}

#[test]
fn downstream_status_is_reported() {
    let ws = Workspace::new();
    let sink = ws.script("sink.sh", "cat > /dev/null\nexit 3\n");

    let result = pipeline::launch(&ws.spec(&format!("echo hi | {}", sink))).unwrap();

    assert_eq!(result.exit_code(), 3);
    assert!(!result.success());
}

#[test]
fn interpreter_routes_pipelines_through_its_channel() {
    let ws = Workspace::new();
    let out = ws.path("out");
    let sink = ws.script("sink.sh", &format!("wc -l > {}\n", out.display()));
    let mut sh = Interpreter::new(Environment::new(Some(ws.fifo.clone())));

    let code = sh
        .dispatch(&format!("seq 1 10 | {}", sink), &mut Vec::new())
        .unwrap();

    assert_eq!(code, 0);
    assert_eq!(read(&out).trim(), "10");
}

#[test]
fn the_same_channel_can_be_reused() {
    let ws = Workspace::new();
    let out = ws.path("out");
    let sink = ws.script("sink.sh", &format!("cat >> {}\n", out.display()));

    pipeline::launch(&ws.spec(&format!("echo one | {}", sink))).unwrap();
    pipeline::launch(&ws.spec(&format!("echo two | {}", sink))).unwrap();

    assert_eq!(read(&out), "one\ntwo\n");
}
