// 内存宿主：按路径保存文件，按命令行回放脚本化输出

use super::{ExecOutput, FileStat, Host};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockHost {
    files: Mutex<BTreeMap<PathBuf, String>>,
    // 每条命令的响应序列，最后一个响应会被重复使用
    commands: Mutex<HashMap<String, VecDeque<Result<ExecOutput, String>>>>,
    executed: Mutex<Vec<String>>,
    interfaces: Mutex<Option<Vec<String>>>,
    failing_writes: Mutex<HashSet<PathBuf>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), content.to_string());
        self
    }

    pub fn with_command(self, command_line: &str, stdout: &str) -> Self {
        self.push_response(
            command_line,
            Ok(ExecOutput {
                code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
        );
        self
    }

    pub fn with_command_code(self, command_line: &str, code: i32, stderr: &str) -> Self {
        self.push_response(
            command_line,
            Ok(ExecOutput {
                code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            }),
        );
        self
    }

    pub fn with_failing_command(self, command_line: &str) -> Self {
        self.push_response(command_line, Err("spawn failed".to_string()));
        self
    }

    pub fn with_system_interfaces(self, names: &[&str]) -> Self {
        *self.interfaces.lock().unwrap() = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn fail_writes_to(self, path: impl Into<PathBuf>) -> Self {
        self.failing_writes.lock().unwrap().insert(path.into());
        self
    }

    pub fn push_response(&self, command_line: &str, response: Result<ExecOutput, String>) {
        self.commands
            .lock()
            .unwrap()
            .entry(command_line.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
}

#[async_trait]
impl Host for MockHost {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        self.file(path).ok_or_else(|| not_found(path))
    }

    async fn write_file(&self, path: &Path, content: &str) -> io::Result<()> {
        if self.failing_writes.lock().unwrap().contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let files = self.files.lock().unwrap();
        let names: Vec<String> = files
            .keys()
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        if names.is_empty() {
            return Err(not_found(path));
        }
        Ok(names)
    }

    async fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        Ok(self.file(path).map(|content| FileStat {
            size: content.len() as u64,
            is_dir: false,
        }))
    }

    async fn exec(&self, program: &str, args: &[&str]) -> io::Result<ExecOutput> {
        let mut command_line = program.to_string();
        for arg in args {
            command_line.push(' ');
            command_line.push_str(arg);
        }
        self.executed.lock().unwrap().push(command_line.clone());

        let mut commands = self.commands.lock().unwrap();
        let Some(responses) = commands.get_mut(&command_line) else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("unscripted command: {}", command_line),
            ));
        };
        let response = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };
        match response {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(io::Error::other(message)),
            None => Err(io::Error::other("no response")),
        }
    }

    async fn system_interfaces(&self) -> io::Result<Vec<String>> {
        self.interfaces
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| io::Error::other("device API unavailable"))
    }
}
