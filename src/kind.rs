use std::fmt;

/// Tag identifying the operation at a process's current program counter.
///
/// The two static membership sets ([`InstructionKind::needs_firmware`] and
/// [`InstructionKind::allowed_when_locked`]) are authoritative per the
/// external AST contract; they are not configurable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    ConfigUpdate,
    If,
    WritePin,
    ReadPin,
    MoveAbsolute,
    SetServoAngle,
    MoveRelative,
    Home,
    FindHome,
    TogglePin,
    Zero,
    Calibrate,
    Sequence,
    RpcRequest,
    CheckUpdates,
    UninstallFarmware,
    UpdateFarmware,
    RpcOk,
    RpcError,
    Install,
    ReadStatus,
    Sync,
    PowerOff,
    Reboot,
    FactoryReset,
    SetUserEnv,
    InstallFirstPartyFarmware,
    ChangeOwnership,
    DumpInfo,
    SendMessage,
    Wait,
    Execute,
    ExecuteScript,
    EmergencyLock,
    EmergencyUnlock,
}

impl InstructionKind {
    /// `NEEDS_FW`: kinds that require exclusive firmware access.
    pub fn needs_firmware(self) -> bool {
        matches!(
            self,
            InstructionKind::ConfigUpdate
                | InstructionKind::If
                | InstructionKind::WritePin
                | InstructionKind::ReadPin
                | InstructionKind::MoveAbsolute
                | InstructionKind::SetServoAngle
                | InstructionKind::MoveRelative
                | InstructionKind::Home
                | InstructionKind::FindHome
                | InstructionKind::TogglePin
                | InstructionKind::Zero
                | InstructionKind::Calibrate
                | InstructionKind::Sequence
                | InstructionKind::RpcRequest
        )
    }

    /// `ALLOWED_WHEN_LOCKED`: kinds that may execute while the system is
    /// emergency-locked.
    pub fn allowed_when_locked(self) -> bool {
        matches!(
            self,
            InstructionKind::CheckUpdates
                | InstructionKind::ConfigUpdate
                | InstructionKind::UninstallFarmware
                | InstructionKind::UpdateFarmware
                | InstructionKind::RpcRequest
                | InstructionKind::RpcOk
                | InstructionKind::RpcError
                | InstructionKind::Install
                | InstructionKind::ReadStatus
                | InstructionKind::Sync
                | InstructionKind::PowerOff
                | InstructionKind::Reboot
                | InstructionKind::FactoryReset
                | InstructionKind::SetUserEnv
                | InstructionKind::InstallFirstPartyFarmware
                | InstructionKind::ChangeOwnership
                | InstructionKind::DumpInfo
                | InstructionKind::If
                | InstructionKind::SendMessage
                | InstructionKind::Sequence
                | InstructionKind::Wait
                | InstructionKind::Execute
                | InstructionKind::ExecuteScript
                | InstructionKind::EmergencyLock
                | InstructionKind::EmergencyUnlock
        )
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
