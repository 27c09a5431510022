///! Login handshake heuristics and keepalive selection.
///!
///! Cluster nodes speak no single protocol: some prompt for a callsign,
///! some greet and wait, some say nothing at all. These predicates match
///! the phrasings seen in the wild; a silent node is eventually treated as
///! logged in by the client (a heuristic, not a protocol guarantee).

const LOGIN_PROMPTS: [&str; 6] = [
    "enter your call",
    "login",
    "callsign",
    "user",
    "please enter",
    "identify",
];

const SUCCESS_MARKERS: [&str; 6] = [
    "welcome",
    "connected",
    "logged in",
    "hello",
    "spots for you",
    "commands",
];

/// Commands a cluster accepts as harmless keepalives.
const KEEPALIVE_COMMANDS: [&str; 4] = ["sh/dx", "sh/u", "", "\r"];

/// Does this line ask us to identify ourselves?
pub fn is_login_prompt(line: &str) -> bool {
    let lower = line.to_lowercase();
    LOGIN_PROMPTS.iter().any(|prompt| lower.contains(prompt))
}

/// Does this line indicate the login was accepted?
pub fn is_login_success(line: &str) -> bool {
    let lower = line.to_lowercase();
    SUCCESS_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Pick a keepalive command by time-based rotation, so the cluster doesn't
/// see identical repeated input. The empty entry means "send nothing this
/// round" and still counts as a keepalive.
pub fn keepalive_command(now_unix_secs: u64) -> &'static str {
    KEEPALIVE_COMMANDS[(now_unix_secs / 30) as usize % KEEPALIVE_COMMANDS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_prompt_detection() {
        assert!(is_login_prompt("Please enter your call:"));
        assert!(is_login_prompt("login: "));
        assert!(is_login_prompt("Callsign?"));
        assert!(!is_login_prompt("DX de ON4KST: 14205.0 JA1ABC"));
    }

    #[test]
    fn test_login_success_detection() {
        assert!(is_login_success("Welcome to DXSpider node"));
        assert!(is_login_success("You are now logged in"));
        assert!(!is_login_success("14025.0 DL0WU CQ"));
    }

    #[test]
    fn test_keepalive_rotation_covers_all_commands() {
        let picks: Vec<&str> = (0..4).map(|i| keepalive_command(i * 30)).collect();
        assert_eq!(picks, vec!["sh/dx", "sh/u", "", "\r"]);
        // Same 30-second bucket yields the same command.
        assert_eq!(keepalive_command(0), keepalive_command(29));
        assert_eq!(keepalive_command(120), keepalive_command(0));
    }
}
