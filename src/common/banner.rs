const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

macro_rules! env_or {
    ($key:literal, $default:literal) => {
        option_env!($key).unwrap_or($default)
    };
}

pub struct BannerInfo {
    pub version: &'static str,
    pub build_time: &'static str,
    pub commit: &'static str,
    pub rust_version: &'static str,
    pub profile: &'static str,
}

impl Default for BannerInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            build_time: env_or!("BUILD_TIME_HUMAN", "unknown"),
            commit: env_or!("GIT_COMMIT_SHORT", "unknown"),
            rust_version: env_or!("RUST_VERSION", "unknown"),
            profile: if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            },
        }
    }
}

pub fn print_banner(info: &BannerInfo) {
    println!();
    println!("{GREEN} _       __                      {RESET}");
    println!("{GREEN}| |     / /___ __   ____  __     {RESET}");
    println!("{GREEN}| | /| / / __ `/ | / / / / /     {RESET}");
    println!("{GREEN}| |/ |/ / /_/ /| |/ / /_/ /      {RESET}");
    println!("{GREEN}|__/|__/\\__,_/ |___/\\__, /     {RESET}");
    println!("{GREEN}                   /____/        {RESET}");
    println!("{DIM}========================================{RESET}");
    println!();

    print_row("Version", info.version, CYAN);
    print_row("Build time", info.build_time, RESET);
    print_row("Commit", info.commit, RESET);
    print_row("Rust", info.rust_version, RESET);
    print_row("Profile", info.profile, YELLOW);

    println!();
}

fn print_row(label: &str, value: &'static str, color: &str) {
    println!("  {BOLD}{label:<14}{RESET}{color}{value}{RESET}");
}
