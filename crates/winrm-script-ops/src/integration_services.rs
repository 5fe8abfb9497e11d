//! Hyper-V VM integration service commands.
//!
//! Integration services are addressed remotely by component GUID, while
//! callers use the display names Hyper-V shows ("Heartbeat", "VSS", ...).
//! The translation goes through the closed [`INTEGRATION_SERVICE_CATEGORY`]
//! table, so an unknown name fails before any script is sent.

use crate::binder::{ArgumentBinder, BoundArgs, CategoricalMapping, ScriptArgs};
use crate::client::ScriptClient;
use crate::session::Session;
use crate::template::TemplateRegistry;
use crate::{ScriptOpsError, ScriptOpsResult};
use serde::Deserialize;

pub const INTEGRATION_SERVICE_CATEGORY: &str = "integration_service";

pub const GET_VM_INTEGRATION_SERVICES: &str = "GetVmIntegrationServices";
pub const ENABLE_VM_INTEGRATION_SERVICE: &str = "EnableVmIntegrationService";
pub const DISABLE_VM_INTEGRATION_SERVICE: &str = "DisableVmIntegrationService";

/// Display name to integration component GUID.
pub const INTEGRATION_SERVICE_IDS: [(&str, &str); 6] = [
    ("Time Synchronization", "2497F4DE-E9FA-4204-80E4-4B75C46419C0"),
    ("Heartbeat", "84EAAE65-2F2E-45F5-9BB5-0E857DC8EB47"),
    ("Key-Value Pair Exchange", "2A34B1C2-FD73-4043-8A5B-DD2159BC743F"),
    ("Shutdown", "9F8233AC-BE49-4C79-8EE3-E7E1985B2077"),
    ("VSS", "5CED1297-4598-4915-A5FC-AD21BB4D02A4"),
    ("Guest Service Interface", "6C09BB55-D683-4DA0-8931-C9BF705F6480"),
];

const GET_VM_INTEGRATION_SERVICES_SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
$vmIntegrationServicesObject = @(Get-VM -Name '{{ vm_pattern }}*' | ?{$_.Name -eq '{{ vm_name }}' } | Get-VMIntegrationService | %{ @{
	Name=$_.Name;
	Enabled=$_.Enabled;
}})

if ($vmIntegrationServicesObject) {
	$vmIntegrationServices = ConvertTo-Json -InputObject $vmIntegrationServicesObject
	$vmIntegrationServices
} else {
	"[]"
}
"#;

const ENABLE_VM_INTEGRATION_SERVICE_SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
Get-VMIntegrationService -VMName '{{ vm_pattern }}' | ?{$_.Id -match '{{ service_id }}'} | Enable-VMIntegrationService
"#;

const DISABLE_VM_INTEGRATION_SERVICE_SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
Get-VMIntegrationService -VMName '{{ vm_pattern }}' | ?{$_.Id -match '{{ service_id }}'} | Disable-VMIntegrationService
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmIntegrationService {
    pub name: String,
    pub enabled: bool,
}

impl VmIntegrationService {
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
        }
    }
}

/// The closed integration service table.
pub fn integration_service_mapping() -> ScriptOpsResult<CategoricalMapping> {
    CategoricalMapping::new(INTEGRATION_SERVICE_CATEGORY, INTEGRATION_SERVICE_IDS)
}

/// Register the integration service templates.
pub fn register_templates(registry: &mut TemplateRegistry) -> ScriptOpsResult<()> {
    registry.register(
        GET_VM_INTEGRATION_SERVICES,
        GET_VM_INTEGRATION_SERVICES_SCRIPT,
    )?;
    registry.register(
        ENABLE_VM_INTEGRATION_SERVICE,
        ENABLE_VM_INTEGRATION_SERVICE_SCRIPT,
    )?;
    registry.register(
        DISABLE_VM_INTEGRATION_SERVICE,
        DISABLE_VM_INTEGRATION_SERVICE_SCRIPT,
    )?;
    Ok(())
}

/// Add the integration service table to `binder`.
pub fn register_categories(binder: ArgumentBinder) -> ScriptOpsResult<ArgumentBinder> {
    binder.with_mapping(integration_service_mapping()?)
}

pub async fn get_vm_integration_services<S: Session>(
    client: &mut ScriptClient<S>,
    vm_name: &str,
) -> ScriptOpsResult<Vec<VmIntegrationService>> {
    let parsed: Vec<PsIntegrationService> = client
        .run_with_result(GET_VM_INTEGRATION_SERVICES, &VmArgs { vm_name })
        .await?;

    Ok(parsed
        .into_iter()
        .map(|service| VmIntegrationService {
            name: service.name,
            enabled: service.enabled,
        })
        .collect())
}

pub async fn enable_vm_integration_service<S: Session>(
    client: &mut ScriptClient<S>,
    vm_name: &str,
    name: &str,
) -> ScriptOpsResult<()> {
    client
        .run_fire_and_forget(
            ENABLE_VM_INTEGRATION_SERVICE,
            &ToggleArgs { vm_name, name },
        )
        .await
}

pub async fn disable_vm_integration_service<S: Session>(
    client: &mut ScriptClient<S>,
    vm_name: &str,
    name: &str,
) -> ScriptOpsResult<()> {
    client
        .run_fire_and_forget(
            DISABLE_VM_INTEGRATION_SERVICE,
            &ToggleArgs { vm_name, name },
        )
        .await
}

/// Enable or disable each listed service in order.
///
/// Stops at the first failure without undoing services already changed.
pub async fn create_or_update_vm_integration_services<S: Session>(
    client: &mut ScriptClient<S>,
    vm_name: &str,
    integration_services: &[VmIntegrationService],
) -> ScriptOpsResult<()> {
    let items = integration_services.iter().map(|service| {
        let template = if service.enabled {
            ENABLE_VM_INTEGRATION_SERVICE
        } else {
            DISABLE_VM_INTEGRATION_SERVICE
        };
        (
            template,
            ToggleArgs {
                vm_name,
                name: &service.name,
            },
        )
    });

    client.apply_batch(items).await
}

struct VmArgs<'a> {
    vm_name: &'a str,
}

impl ScriptArgs for VmArgs<'_> {
    fn bind(&self, _binder: &ArgumentBinder) -> ScriptOpsResult<BoundArgs> {
        let vm_name = require_vm_name(self.vm_name)?;
        BoundArgs::new()
            .text("vm_name", vm_name)?
            .wildcard_literal("vm_pattern", vm_name)
    }
}

struct ToggleArgs<'a> {
    vm_name: &'a str,
    name: &'a str,
}

impl ScriptArgs for ToggleArgs<'_> {
    fn bind(&self, binder: &ArgumentBinder) -> ScriptOpsResult<BoundArgs> {
        let service_id = binder.resolve(INTEGRATION_SERVICE_CATEGORY, self.name)?;
        BoundArgs::new()
            .wildcard_literal("vm_pattern", require_vm_name(self.vm_name)?)?
            .identifier("service_id", service_id)
    }
}

fn require_vm_name(vm_name: &str) -> ScriptOpsResult<&str> {
    if vm_name.trim().is_empty() {
        return Err(ScriptOpsError::InvalidArgument {
            key: "vm_name".to_string(),
            message: "vm name must not be empty".to_string(),
        });
    }
    Ok(vm_name)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PsIntegrationService {
    name: String,
    enabled: bool,
}
