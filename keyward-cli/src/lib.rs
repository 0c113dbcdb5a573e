//! Command surface and JSON responses for the `keyward` binary.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use keyward_license::{
    InstanceFilter, LicenseError, LicenseResult, Licensing, LicensingConfig, NewLicense,
};
use keyward_types::{
    InstalledOnId, InstanceId, License, LicenseId, LicenseStatus, Timestamp,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "keyward")]
#[command(about = "License activation and installation tracking")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "keyward.toml")]
    pub config: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print a configuration with freshly generated keys
    InitConfig,

    /// Create a license
    Issue {
        key: String,
        /// Activation quota; omit or 0 to disable activation
        #[arg(long)]
        max: Option<u32>,
        #[arg(long)]
        product_id: Option<i64>,
        #[arg(long, default_value = "active")]
        status: LicenseStatus,
        /// RFC 3339 expiry, e.g. 2027-01-01T00:00:00Z
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
    },

    /// Replace the key of a license
    Rekey { license_id: LicenseId, new_key: String },

    /// Change the status of a license
    SetStatus {
        license_id: LicenseId,
        status: LicenseStatus,
    },

    /// Bind an instance to a license
    Activate { license_key: String, instance_key: String },

    /// Release an instance from a license
    Deactivate { license_key: String, instance_key: String },

    /// Check that an instance is bound to a license
    Validate { license_key: String, instance_key: String },

    /// Move an instance to another license and/or identifier
    Reassign {
        instance_id: InstanceId,
        license_key: String,
        instance_key: String,
    },

    /// Deactivate instances by id, skipping missing ones
    BulkDeactivate {
        #[arg(required = true)]
        instance_ids: Vec<InstanceId>,
    },

    /// List instances, newest first
    Instances {
        #[arg(long)]
        license_id: Option<LicenseId>,
        /// Match a plaintext instance identifier
        #[arg(long)]
        instance_key: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Decrypt instance identifiers
    Reveal {
        #[arg(required = true)]
        instance_ids: Vec<InstanceId>,
    },

    /// Record an installation heartbeat
    Ping {
        product: String,
        host: String,
        #[arg(long)]
        license_key: Option<String>,
    },

    /// List installation heartbeats
    Installs {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Delete installation heartbeats by id
    DeleteInstalls {
        #[arg(required = true)]
        ids: Vec<InstalledOnId>,
    },
}

/// License fields safe to print: no ciphertext, no hash.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LicenseSummary {
    pub id: LicenseId,
    pub status: LicenseStatus,
    pub times_activated: u32,
    pub times_activated_max: Option<u32>,
    pub product_id: Option<i64>,
    pub expires_at: Option<Timestamp>,
}

impl From<&License> for LicenseSummary {
    fn from(license: &License) -> Self {
        Self {
            id: license.id,
            status: license.status,
            times_activated: license.times_activated,
            times_activated_max: license.times_activated_max,
            product_id: license.product_id,
            expires_at: license.expires_at,
        }
    }
}

/// Body printed when a command fails with a licensing error.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub kind: &'static str,
    pub message: String,
}

impl From<&LicenseError> for ErrorResponse {
    fn from(err: &LicenseError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Renders a fresh configuration for `init-config`.
pub fn init_config() -> LicenseResult<String> {
    LicensingConfig::generate().to_toml_string()
}

/// Runs one command and returns its JSON response.
///
/// `InitConfig` needs no database and is handled by [`init_config`].
pub fn execute(licensing: &Licensing, command: Command) -> LicenseResult<Value> {
    let activations = licensing.activations();
    let response = match command {
        Command::InitConfig => json!({ "config": init_config()? }),
        Command::Issue {
            key,
            max,
            product_id,
            status,
            expires_at,
        } => {
            let license = licensing.issuer().issue(&NewLicense {
                key,
                times_activated_max: max,
                product_id,
                status,
                expires_at: expires_at.map(Timestamp::from),
            })?;
            json!(LicenseSummary::from(&license))
        }
        Command::Rekey {
            license_id,
            new_key,
        } => json!(LicenseSummary::from(
            &licensing.issuer().update_key(license_id, &new_key)?
        )),
        Command::SetStatus { license_id, status } => json!(LicenseSummary::from(
            &licensing.issuer().set_status(license_id, status)?
        )),
        Command::Activate {
            license_key,
            instance_key,
        } => {
            let activation = activations.activate(&license_key, &instance_key)?;
            json!({
                "instance_id": activation.instance.id,
                "license": LicenseSummary::from(&activation.license),
            })
        }
        Command::Deactivate {
            license_key,
            instance_key,
        } => {
            activations.deactivate(&license_key, &instance_key)?;
            json!({ "deactivated": true })
        }
        Command::Validate {
            license_key,
            instance_key,
        } => json!(activations.validate(&license_key, &instance_key)?),
        Command::Reassign {
            instance_id,
            license_key,
            instance_key,
        } => {
            let instance = activations.reassign_instance(instance_id, &license_key, &instance_key)?;
            json!({ "instance_id": instance.id, "license_id": instance.license_id })
        }
        Command::BulkDeactivate { instance_ids } => {
            json!({ "deactivated": activations.bulk_deactivate(&instance_ids) })
        }
        Command::Instances {
            license_id,
            instance_key,
            limit,
            offset,
        } => {
            let filter = InstanceFilter {
                license_id,
                instance_key,
                limit,
                offset,
            };
            json!({
                "total": activations.count_instances(&filter)?,
                "instances": activations.list_instances(&filter)?,
            })
        }
        Command::Reveal { instance_ids } => {
            let keys = activations.reveal_instance_keys(&instance_ids)?;
            let keys: serde_json::Map<String, Value> = keys
                .into_iter()
                .map(|(id, key)| (id.to_string(), Value::String(key)))
                .collect();
            Value::Object(keys)
        }
        Command::Ping {
            product,
            host,
            license_key,
        } => json!(licensing
            .tracker()
            .ping_with_key(&product, license_key.as_deref(), &host)?),
        Command::Installs { limit, offset } => json!({
            "total": licensing.tracker().count()?,
            "installs": licensing.tracker().list(limit, offset)?,
        }),
        Command::DeleteInstalls { ids } => {
            json!({ "deleted": licensing.tracker().delete(&ids)? })
        }
    };
    Ok(response)
}
