//! Probe command - show capture support and format negotiation

use anyhow::Result;
use clap::Args;
use lectern_core::capture::{probe as caps, Capabilities, MediaEnvironment};
use lectern_core::encode::{default_container, file_extension, negotiate_mime_type};
use lectern_core::sim::SimulatedEnvironment;
use lectern_core::CaptureMode;
use serde::Serialize;

/// Arguments for the probe command
#[derive(Args)]
pub struct ProbeArgs {
    /// Simulate an insecure context
    #[arg(long)]
    no_secure_context: bool,

    /// Simulate missing camera/microphone access
    #[arg(long)]
    no_user_media: bool,

    /// Simulate missing screen sharing
    #[arg(long)]
    no_display_media: bool,

    /// Simulate a missing encoder
    #[arg(long)]
    no_encoder: bool,

    /// Restrict supported MIME types (comma separated)
    #[arg(long, value_delimiter = ',')]
    types: Option<Vec<String>>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ModeReport {
    mode: CaptureMode,
    supported: bool,
    reason: Option<&'static str>,
    mime_type: &'static str,
    negotiated: bool,
    extension: &'static str,
}

#[derive(Serialize)]
struct ProbeReport {
    capabilities: Capabilities,
    modes: Vec<ModeReport>,
}

/// Show capture support for every mode
pub async fn probe(args: ProbeArgs) -> Result<()> {
    let capabilities = Capabilities {
        secure_context: !args.no_secure_context,
        user_media: !args.no_user_media,
        display_media: !args.no_display_media,
        encoder: !args.no_encoder,
    };

    let mut env = SimulatedEnvironment::new().with_capabilities(capabilities);
    if let Some(types) = args.types {
        env = env.with_supported_types(types.into_iter().map(|t| t.trim().to_string()));
    }

    let report = ProbeReport {
        capabilities: env.capabilities(),
        modes: CaptureMode::ALL
            .iter()
            .map(|&mode| mode_report(&env, mode))
            .collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Lectern - Capture Support\n");

    println!("Environment:");
    let flag = |ok: bool| if ok { "[OK]" } else { "[!!]" };
    println!("  {} Secure context", flag(report.capabilities.secure_context));
    println!("  {} Camera/microphone access", flag(report.capabilities.user_media));
    println!("  {} Screen sharing", flag(report.capabilities.display_media));
    println!("  {} Media encoder", flag(report.capabilities.encoder));
    println!();

    println!("Capture modes:");
    for mode in &report.modes {
        match mode.reason {
            None => println!("  {:<7} supported", mode.mode.as_str()),
            Some(reason) => println!("  {:<7} unavailable ({})", mode.mode.as_str(), reason),
        }
        if mode.negotiated {
            println!("          format: {}", mode.mime_type);
        } else {
            println!("          format: {} (encoder default)", mode.mime_type);
        }
        println!("          saved as: *.{}", mode.extension);
    }

    if report.modes.iter().any(|m| !m.supported) {
        println!();
        println!("Unavailable modes offer a file upload instead of recording.");
    }

    Ok(())
}

fn mode_report(env: &SimulatedEnvironment, mode: CaptureMode) -> ModeReport {
    let reason = caps::unsupported_reason(mode, &env.capabilities());
    let negotiated = negotiate_mime_type(mode, |m| env.is_type_supported(m));
    ModeReport {
        mode,
        supported: reason.is_none(),
        reason,
        mime_type: negotiated.unwrap_or_else(|| default_container(mode)),
        negotiated: negotiated.is_some(),
        extension: file_extension(mode),
    }
}
