//! Command line flags for the feed server.

pub const DEFAULT_PORT: u16 = 24050;
pub const DEFAULT_PLAY_SECS: f64 = 30.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedArgs {
    pub port: u16,
    /// Fixed RNG seed; random when absent.
    pub seed: Option<u64>,
    pub play_secs: f64,
}

impl Default for FeedArgs {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            seed: None,
            play_secs: DEFAULT_PLAY_SECS,
        }
    }
}

pub fn usage(prog: &str) -> String {
    format!("Usage: {prog} [--port PORT|-p PORT] [--seed N] [--play-secs SECS]")
}

/// `Err` carries the text to print (usage or a bad value).
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<FeedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "tickbar_feed".into());
    let mut out = FeedArgs::default();

    while let Some(a) = it.next() {
        let (flag, inline) = match a.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
            _ => (a.clone(), None),
        };
        let mut value = |name: &str| {
            inline
                .clone()
                .or_else(|| it.next())
                .ok_or_else(|| format!("{name} needs a value. {}", usage(&prog)))
        };
        match flag.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--port" | "-p" => {
                let v = value("--port")?;
                out.port = v.parse().map_err(|_| format!("invalid port '{v}'"))?;
            }
            "--seed" => {
                let v = value("--seed")?;
                out.seed = Some(v.parse().map_err(|_| format!("invalid seed '{v}'"))?);
            }
            "--play-secs" => {
                let v = value("--play-secs")?;
                out.play_secs = match v.parse::<f64>() {
                    Ok(s) if s.is_finite() && s > 0.0 => s,
                    _ => return Err(format!("invalid play length '{v}'")),
                };
            }
            _ => return Err(format!("Unexpected argument '{a}'. {}", usage(&prog))),
        }
    }
    Ok(out)
}
