// Command-line surface of dns-tools.
//
// Every flag has an environment fallback so the binary can run in a pod
// configured only through env vars.

use clap::{Args, Parser, Subcommand, ValueEnum};
use dns_tools_core::config::{self, StateStoreConfig};
use dns_tools_core::{Error, FilterSet, ReconcileSettings, WatchSettings};
use dns_tools_ip_http::DEFAULT_IP_ENDPOINT;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "dns-tools", author, version, about = "Tools available for DNS operation")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DNS_TOOLS_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch the global IPv4 address and announce changes
    Gip(GipArgs),
    /// Rewrite the domain's DNS A records with a given address
    Flare(FlareArgs),
    /// Post a text message to the chat webhook
    Slack(SlackArgs),
}

/// Whether record updates are sent or only logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RunMode {
    #[default]
    Live,
    DryRun,
}

/// Cloudflare access and record selection
#[derive(Debug, Clone, Args)]
pub struct DnsArgs {
    /// Cloudflare API token
    #[arg(long = "cloudflare-api-token", env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Zone whose A records are reconciled
    #[arg(long = "dns-domain", env = "DNS_DOMAIN")]
    pub domain: Option<String>,

    /// Comma separated substrings; only matching names are updated
    #[arg(long = "fqdn-filters", env = "FQDN_FILTERS")]
    pub filters: Option<String>,

    /// Comma separated substrings; matching names are never updated
    #[arg(long = "fqdn-ignore-filters", env = "FQDN_IGNORE_FILTERS")]
    pub ignore_filters: Option<String>,

    /// `dry-run` logs record updates instead of sending them
    #[arg(long, env = "DNS_TOOLS_MODE", value_enum, default_value_t = RunMode::Live)]
    pub mode: RunMode,
}

impl DnsArgs {
    /// Include/exclude filters
    pub fn filter_set(&self) -> FilterSet {
        FilterSet::new(
            self.filters.as_deref().map(config::split_list).unwrap_or_default(),
            self.ignore_filters.as_deref().map(config::split_list).unwrap_or_default(),
        )
    }

    /// Token and reconcile settings, or `None` when DNS is not configured
    ///
    /// Setting only one of token and domain is a configuration error.
    pub fn reconcile(&self) -> Result<Option<(String, ReconcileSettings)>, Error> {
        let token = self.api_token.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let domain = self.domain.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (token, domain) {
            (Some(token), Some(domain)) => {
                let settings = ReconcileSettings::new(domain).with_filters(self.filter_set());
                settings.validate()?;
                Ok(Some((token.to_string(), settings)))
            }
            (None, None) => Ok(None),
            (Some(_), None) => Err(Error::config("config not set DNS_DOMAIN")),
            (None, Some(_)) => Err(Error::config("config not set CLOUDFLARE_API_TOKEN")),
        }
    }

    /// Like [`DnsArgs::reconcile`] but both values are required
    pub fn require_reconcile(&self) -> Result<(String, ReconcileSettings), Error> {
        self.reconcile()?
            .ok_or_else(|| Error::config("config not set CLOUDFLARE_API_TOKEN, DNS_DOMAIN"))
    }

    pub fn dry_run(&self) -> bool {
        self.mode == RunMode::DryRun
    }
}

#[derive(Debug, Clone, Args)]
pub struct GipArgs {
    /// Polling interval like 5s, 2m, or 3h
    #[arg(long, env = "LOOP_INTERVAL", default_value = "5s", value_parser = parse_interval_arg)]
    pub interval: Duration,

    /// Announce even when no previous address was stored
    #[arg(long)]
    pub nilfire: bool,

    /// Chat webhook to notify on change
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub slack_webhook_url: Option<String>,

    /// CloudEvents sink to notify on change
    #[arg(long, env = "K_SINK")]
    pub k_sink: Option<String>,

    /// Where the last address is kept (kube, file, memory)
    #[arg(long, env = "DNS_TOOLS_STATE", default_value = "kube")]
    pub state: String,

    /// State file path for the file state store
    #[arg(long, env = "DNS_TOOLS_STATE_PATH")]
    pub state_path: Option<String>,

    /// Plain-text endpoint returning the caller's address
    #[arg(long, env = "DNS_TOOLS_IP_URL", default_value = DEFAULT_IP_ENDPOINT)]
    pub ip_url: String,

    #[command(flatten)]
    pub dns: DnsArgs,
}

impl GipArgs {
    pub fn watch_settings(&self) -> Result<WatchSettings, Error> {
        let settings =
            WatchSettings::new(self.interval).with_fire_on_first_observation(self.nilfire);
        settings.validate()?;
        Ok(settings)
    }

    pub fn state_store(&self) -> Result<StateStoreConfig, Error> {
        StateStoreConfig::from_parts(&self.state, self.state_path.as_deref())
    }

    pub fn slack_webhook_url(&self) -> Option<&str> {
        non_blank(self.slack_webhook_url.as_deref())
    }

    pub fn k_sink(&self) -> Option<&str> {
        non_blank(self.k_sink.as_deref())
    }
}

#[derive(Debug, Clone, Args)]
pub struct FlareArgs {
    /// New address to set on the A records
    #[arg(value_name = "NEW_IP")]
    pub new_ip: String,

    #[command(flatten)]
    pub dns: DnsArgs,
}

impl FlareArgs {
    pub fn target(&self) -> Result<IpAddr, Error> {
        self.new_ip
            .trim()
            .parse()
            .map_err(|_| Error::malformed(self.new_ip.clone(), "NEW_IP argument"))
    }
}

#[derive(Debug, Clone, Args)]
pub struct SlackArgs {
    /// Message text
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Chat webhook URL
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub slack_webhook_url: Option<String>,
}

fn parse_interval_arg(raw: &str) -> Result<Duration, String> {
    config::parse_interval(raw).map_err(|e| e.to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};

    /// Parse with every env fallback removed so the host environment
    /// cannot leak into the result
    fn try_parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let no_env = |arg: clap::Arg| arg.env(None::<&'static str>);
        let command = Cli::command()
            .mut_args(no_env)
            .mut_subcommand("gip", |c| c.mut_args(no_env))
            .mut_subcommand("flare", |c| c.mut_args(no_env))
            .mut_subcommand("slack", |c| c.mut_args(no_env));
        let matches = command.try_get_matches_from(args)?;
        Cli::from_arg_matches(&matches)
    }

    fn parse(args: &[&str]) -> Cli {
        try_parse(args).unwrap()
    }

    #[test]
    fn test_gip_defaults() {
        let cli = parse(&["dns-tools", "gip", "--state", "memory"]);
        let Command::Gip(gip) = cli.command else {
            panic!("expected gip");
        };

        let settings = gip.watch_settings().unwrap();
        assert_eq!(settings.interval, Duration::from_secs(5));
        assert!(!settings.fire_on_first_observation);
        assert_eq!(gip.state_store().unwrap(), StateStoreConfig::Memory);
        assert_eq!(gip.ip_url, DEFAULT_IP_ENDPOINT);
        assert!(gip.slack_webhook_url().is_none());
        assert!(gip.k_sink().is_none());
        assert!(gip.dns.reconcile().unwrap().is_none());
    }

    #[test]
    fn test_gip_flags() {
        let cli = parse(&[
            "dns-tools",
            "gip",
            "--interval",
            "2m",
            "--nilfire",
            "--state",
            "file",
            "--state-path",
            "/tmp/gip.json",
        ]);
        let Command::Gip(gip) = cli.command else {
            panic!("expected gip");
        };

        let settings = gip.watch_settings().unwrap();
        assert_eq!(settings.interval, Duration::from_secs(120));
        assert!(settings.fire_on_first_observation);
        assert_eq!(
            gip.state_store().unwrap(),
            StateStoreConfig::File {
                path: "/tmp/gip.json".into()
            }
        );
    }

    #[test]
    fn test_bad_interval_rejected_at_parse() {
        assert!(try_parse(&["dns-tools", "gip", "--interval", "5x"]).is_err());
        assert!(try_parse(&["dns-tools", "gip", "--interval", "0s"]).is_err());
    }

    #[test]
    fn test_flare_reconcile_settings() {
        let cli = parse(&[
            "dns-tools",
            "flare",
            "198.51.100.9",
            "--cloudflare-api-token",
            "tok",
            "--dns-domain",
            "example.com",
            "--fqdn-filters",
            "www, api",
            "--fqdn-ignore-filters",
            "vpn",
            "--mode",
            "dry-run",
        ]);
        let Command::Flare(flare) = cli.command else {
            panic!("expected flare");
        };

        assert_eq!(flare.target().unwrap(), IpAddr::from([198, 51, 100, 9]));
        assert!(flare.dns.dry_run());

        let (token, settings) = flare.dns.require_reconcile().unwrap();
        assert_eq!(token, "tok");
        assert_eq!(settings.domain, "example.com");
        assert_eq!(settings.filters.include, vec!["www", "api"]);
        assert_eq!(settings.filters.exclude, vec!["vpn"]);
    }

    #[test]
    fn test_flare_rejects_bad_address() {
        let cli = parse(&["dns-tools", "flare", "not-an-ip"]);
        let Command::Flare(flare) = cli.command else {
            panic!("expected flare");
        };
        assert!(flare.target().is_err());
    }

    #[test]
    fn test_partial_dns_config_is_an_error() {
        let dns = DnsArgs {
            api_token: Some("tok".into()),
            domain: None,
            filters: None,
            ignore_filters: None,
            mode: RunMode::Live,
        };
        assert!(dns.reconcile().is_err());

        let none = DnsArgs {
            api_token: Some("  ".into()),
            ..dns
        };
        assert!(none.reconcile().unwrap().is_none());
        assert!(none.require_reconcile().is_err());
    }

    #[test]
    fn test_slack_requires_text() {
        assert!(try_parse(&["dns-tools", "slack"]).is_err());
        let cli = parse(&["dns-tools", "slack", "hello"]);
        assert!(matches!(cli.command, Command::Slack(SlackArgs { ref text, .. }) if text == "hello"));
    }
}
