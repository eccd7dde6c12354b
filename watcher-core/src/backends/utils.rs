use crate::traits::Network;
use crate::{Error, Result};
use tokio::process::Command;

/// Runs a command and returns its stdout, failing on a non-zero exit status.
pub(crate) async fn run_command(program: &str, args: &[&str]) -> Result<String> {
    tracing::debug!("Running {} {}", program, args.join(" "));
    let output = Command::new(program).args(args).output().await?;

    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr);
        return Err(Error::CommandFailed(format!(
            "{} {} failed: {}",
            program,
            args.first().copied().unwrap_or_default(),
            err.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// dBm (-100..-50) 映射为 0..100 的百分比
pub(crate) fn dbm_to_percent(dbm: i16) -> u8 {
    ((dbm.clamp(-100, -50) + 100) * 2) as u8
}

fn security_from_flags(flags: &str) -> String {
    if flags.contains("WPA2") {
        "WPA2".to_string()
    } else if flags.contains("WPA") {
        "WPA".to_string()
    } else if flags.contains("WEP") {
        "WEP".to_string()
    } else {
        "Open".to_string()
    }
}

/// 将 wpa_supplicant 输出中的 `\xHH` 转义序列反转义回原始字节。
/// 主要用于处理扫描结果中 SSID 字段中的汉字等非 ASCII 字符。
pub(crate) fn unescape_wpa_ssid(s: &str) -> Vec<u8> {
    fn hex_val(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(10 + b - b'a'),
            b'A'..=b'F' => Some(10 + b - b'A'),
            _ => None,
        }
    }

    let bs = s.as_bytes();
    let mut out = Vec::with_capacity(bs.len());
    let mut i = 0;
    while i < bs.len() {
        if bs[i] != b'\\' || i + 1 >= bs.len() {
            out.push(bs[i]);
            i += 1;
            continue;
        }
        match bs[i + 1] {
            b'x' | b'X' if i + 3 < bs.len() => {
                if let (Some(v1), Some(v2)) = (hex_val(bs[i + 2]), hex_val(bs[i + 3])) {
                    out.push((v1 << 4) | v2);
                    i += 4;
                } else {
                    // 格式不正确，按字面量保留反斜杠
                    out.push(b'\\');
                    i += 1;
                }
            }
            b'\\' => {
                out.push(b'\\');
                i += 2;
            }
            b'"' => {
                out.push(b'"');
                i += 2;
            }
            _ => {
                out.push(b'\\');
                i += 1;
            }
        }
    }
    out
}

/// Parse `wpa_cli scan_results` output.
/// 格式: bssid / frequency / signal level / flags / ssid
pub(crate) fn parse_wpa_scan_results(output: &str) -> Vec<Network> {
    let mut networks = Vec::new();
    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 5 {
            continue;
        }

        let signal_dbm: i16 = parts[2].parse().unwrap_or(-100);
        let ssid = String::from_utf8_lossy(&unescape_wpa_ssid(parts[4])).into_owned();

        if ssid.is_empty() || ssid == "\0" {
            continue;
        }

        networks.push(Network {
            ssid,
            signal: dbm_to_percent(signal_dbm),
            security: security_from_flags(parts[3]),
        });
    }
    networks
}

/// Splits one line of `nmcli -t` output on unescaped `:`.
/// nmcli escapes `:` as `\:` and `\` as `\\` in terse mode.
pub(crate) fn split_nmcli_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) => current.push(next),
                None => current.push('\\'),
            },
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse `nmcli -t -f SSID,SIGNAL,SECURITY device wifi list` output.
/// nmcli 的 SIGNAL 已经是百分比。
pub(crate) fn parse_nmcli_list(output: &str) -> Vec<Network> {
    let mut networks = Vec::new();
    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let parts = split_nmcli_terse(line);
        let ssid = parts.first().cloned().unwrap_or_default();
        if ssid.is_empty() {
            continue;
        }
        let signal = parts
            .get(1)
            .and_then(|s| s.parse::<u8>().ok())
            .unwrap_or(0)
            .min(100);
        let security = match parts.get(2).map(|s| s.trim()) {
            Some("") | Some("--") => "Open".to_string(),
            Some(s) => s.to_string(),
            None => "Unknown".to_string(),
        };
        networks.push(Network {
            ssid,
            signal,
            security,
        });
    }
    networks
}
