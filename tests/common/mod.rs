#![allow(dead_code)]

pub mod docroot {
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Creates a temporary document root holding `files` (relative path, contents).
    pub fn with_files(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, contents) in files {
            write(dir.path(), path, contents);
        }
        dir
    }

    pub fn write(root: &Path, path: &str, contents: &str) {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, contents).unwrap();
    }
}

pub mod counting {
    use scriptpage::handlers::RequestContext;
    use scriptpage::script::{
        CompileError, Diagnostic, Location, ReferenceSet, RenderError, Script, ScriptCompiler, SourcePath,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// What [`CountingCompiler`] does for a path, chosen by its file name.
    ///
    /// - `*broken*` - one error diagnostic
    /// - `*empty*` - no entry point
    /// - anything else - a script rendering `"<p>{path}</p>"`
    pub struct CountingCompiler {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingCompiler {
        pub fn new() -> Self {
            Self::with_delay(Duration::ZERO)
        }

        /// Sleeps `delay` in every compile, to widen race windows.
        pub fn with_delay(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    struct PathScript(String);

    impl Script for PathScript {
        fn render(&self, _ctx: &RequestContext) -> Result<String, RenderError> {
            Ok(format!("<p>{}</p>", self.0))
        }
    }

    impl ScriptCompiler for CountingCompiler {
        fn compile(&self, source: &SourcePath, _references: &ReferenceSet) -> Result<Arc<dyn Script>, CompileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            let path = source.as_str();
            if path.contains("broken") {
                Err(CompileError::Diagnostics(vec![Diagnostic::error(
                    "expected expression",
                    Location::at(path, Some(3), Some(7)),
                )]))
            } else if path.contains("empty") {
                Err(CompileError::NoScriptTypeFound(source.clone()))
            } else {
                Ok(Arc::new(PathScript(path.to_string())))
            }
        }
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::sync::Once;
    use std::time::Duration;

    static MAY_INIT: Once = Once::new();

    /// Configure May coroutines once, with the stack size the server ships with.
    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(scriptpage::config::DEFAULT_STACK_SIZE);
        });
    }

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 4096];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {:?}", e),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    pub fn get(addr: &SocketAddr, path: &str) -> String {
        send_request(addr, &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"))
    }

    /// Status code, content type and body of a raw HTTP response.
    pub fn parse_parts(resp: &str) -> (u16, String, String) {
        let (headers, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut status = 0;
        let mut content_type = String::new();
        for line in headers.lines() {
            if line.starts_with("HTTP/1.1") {
                status = line.split_whitespace().nth(1).unwrap_or("0").parse().unwrap();
            } else if let Some((name, val)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-type") {
                    content_type = val.trim().to_string();
                }
            }
        }
        (status, content_type, body.to_string())
    }
}
