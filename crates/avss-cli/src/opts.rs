use gumdrop::Options;
use threshold_primitives::poly::Idx;

#[derive(Debug, Options, Clone)]
pub struct AvssOpts {
    pub help: bool,
    #[options(command)]
    pub command: Option<Command>,
}

// The supported commands
#[derive(Debug, Options, Clone)]
pub enum Command {
    #[options(help = "runs a DKG between local shareholders and prints the outcome as JSON")]
    Run(RunOpts),
}

#[derive(Debug, Options, Clone, Default)]
pub struct RunOpts {
    pub help: bool,

    #[options(help = "path to a JSON file with the DKG configuration (flags take precedence)")]
    pub config: Option<String>,

    #[options(help = "the number of shareholders")]
    pub n: Option<usize>,

    #[options(help = "the number of shares needed to reconstruct the secret")]
    pub k: Option<usize>,

    #[options(help = "the maximum number of faulty shareholders")]
    pub f: Option<usize>,

    #[options(help = "milliseconds to wait for each shareholder to finish")]
    pub timeout_ms: Option<u64>,

    #[options(help = "index of a shareholder which never broadcasts (repeatable)")]
    pub silent: Vec<Idx>,

    #[options(help = "index of a dealer which commits without blinding (repeatable)")]
    pub omit_blinding: Vec<Idx>,

    #[options(help = "index of a shareholder which never deals a contribution (repeatable)")]
    pub withhold: Vec<Idx>,

    #[options(
        no_short,
        help = "the path where the summary of the DKG will be stored (stdout if none provided)"
    )]
    pub output: Option<String>,
}
