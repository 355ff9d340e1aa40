use std::process::Command;
use std::str;

/// CLI interface tests
#[cfg(test)]
mod cli_tests {
    use super::*;
    use tcphex::infrastructure::tcp::{ServerMode, TestServer};

    fn tcphex() -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_tcphex"));
        command.arg("--quiet");
        command
    }

    #[test]
    fn test_cli_help() {
        let output = tcphex().arg("--help").output().expect("Failed to execute command");

        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert!(output.status.success());
        assert!(stdout.contains("Usage:"));
        assert!(stdout.contains("Commands:"));
        assert!(stdout.contains("exchange"));
        assert!(stdout.contains("shell"));
        assert!(stdout.contains("serve"));
        assert!(stdout.contains("codec"));
        assert!(stdout.contains("config"));
    }

    #[test]
    fn test_cli_version() {
        let output = tcphex().arg("version").output().expect("Failed to execute command");

        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert!(output.status.success());
        assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_cli_codec_normalize() {
        let output = tcphex()
            .args(["codec", "normalize", "a0 01 01 a2"])
            .output()
            .expect("Failed to execute command");

        assert!(output.status.success());
        assert_eq!(str::from_utf8(&output.stdout).unwrap().trim(), "A00101A2");
    }

    #[test]
    fn test_cli_codec_rejects_bad_hex() {
        let output = tcphex()
            .args(["codec", "decode", "ABC"])
            .output()
            .expect("Failed to execute command");

        assert!(!output.status.success());
        let stderr = str::from_utf8(&output.stderr).unwrap();
        assert!(stderr.contains("Invalid hex"));
    }

    #[test]
    fn test_cli_presets_json() {
        let output = tcphex()
            .args(["-o", "json", "presets"])
            .output()
            .expect("Failed to execute command");

        assert!(output.status.success());
        let presets: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert!(presets.as_array().map_or(false, |p| !p.is_empty()));
    }

    #[test]
    fn test_cli_invalid_command() {
        let output = tcphex().arg("frobnicate").output().expect("Failed to execute command");
        assert!(!output.status.success());
    }

    #[test]
    fn test_cli_exchange_invalid_port() {
        let output = tcphex()
            .args(["exchange", "127.0.0.1", "70000", "01"])
            .output()
            .expect("Failed to execute command");

        assert!(!output.status.success());
        assert!(str::from_utf8(&output.stderr).unwrap().contains("Invalid port"));
    }

    #[test]
    fn test_cli_exchange_refused() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let output = tcphex()
            .args(["-o", "json", "exchange", "127.0.0.1", &port.to_string(), "01"])
            .output()
            .expect("Failed to execute command");

        assert_eq!(output.status.code(), Some(1));
        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["connect"]["connected"], false);
        assert!(report.get("send").is_none());
    }

    #[tokio::test]
    async fn test_cli_exchange_against_echo_server() {
        let mut server = TestServer::bind("127.0.0.1:0", ServerMode::Echo).await.unwrap();
        server.start().unwrap();
        let port = server.local_addr().port().to_string();

        let output = tokio::task::spawn_blocking(move || {
            tcphex()
                .args(["-o", "json", "exchange", "127.0.0.1", &port, "A0 01 01 A2", "-r", "2"])
                .output()
                .expect("Failed to execute command")
        })
        .await
        .unwrap();

        assert!(output.status.success());
        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["connect"]["connected"], true);
        assert_eq!(report["send"]["success"]["0"]["received"], "A00101A2");
        assert_eq!(report["send"]["success"]["1"]["sent"], "A0 01 01 A2");
        assert!(report["log"].as_array().unwrap().len() >= 4);

        server.shutdown().await.unwrap();
    }
}
