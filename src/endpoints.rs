//! Matter clusters backing the input and output endpoints.

use esp_idf_matter::matter::dm::clusters::decl::on_off as on_off_cluster;
use esp_idf_matter::matter::dm::clusters::on_off::{
    EffectVariantEnum, OnOffHooks, StartUpOnOffEnum,
};
use esp_idf_matter::matter::dm::{Cluster, Dataver, DeviceType, ReadContext};
use esp_idf_matter::matter::error::Error;
use esp_idf_matter::matter::tlv::Nullable;
use esp_idf_matter::matter::with;

use log::{error, info};

use crate::config::OutputPin;
use crate::gpio::EspGpio;
use crate::input::ContactState;
use crate::output::SwitchedOutput;

rs_matter::import!(BooleanState);

pub const DEV_TYPE_CONTACT_SENSOR: DeviceType = DeviceType {
    dtype: 0x0015,
    drev: 1,
};

pub const CONTACT_CLUSTER: Cluster<'static> = boolean_state::FULL_CLUSTER
    .with_revision(1)
    .with_attrs(with!(required; boolean_state::AttributeId::StateValue));

/// `StateValue` of one contact sensor endpoint, shared between the
/// input poller and the cluster handler.
pub struct ContactSensor {
    dataver: Dataver,
    state: ContactState,
}

impl ContactSensor {
    pub fn new(dataver: Dataver, state: bool) -> Self {
        Self {
            dataver,
            state: ContactState::new(state),
        }
    }

    /// Returns `true` if the value changed; the caller notifies subscribers.
    pub fn set(&self, state: bool) -> bool {
        if !self.state.set(state) {
            return false;
        }

        self.dataver.changed();
        true
    }
}

pub struct ContactSensorHandler<'a>(pub &'a ContactSensor);

impl boolean_state::ClusterHandler for ContactSensorHandler<'_> {
    const CLUSTER: Cluster<'static> = CONTACT_CLUSTER;

    fn dataver(&self) -> u32 {
        self.0.dataver.get()
    }

    fn dataver_changed(&self) {
        self.0.dataver.changed();
    }

    fn state_value(&self, _ctx: impl ReadContext) -> Result<bool, Error> {
        Ok(self.0.state.get())
    }
}

/// One GPIO output exposed as an On/Off Light.
pub struct OutputSwitch(SwitchedOutput<EspGpio>);

impl OutputSwitch {
    pub fn new(index: usize, pin: OutputPin) -> Self {
        Self(SwitchedOutput::new(index, pin, EspGpio))
    }
}

impl OnOffHooks for OutputSwitch {
    // Lighting adds OffWithEffect, the timed commands and StartUpOnOff.
    const CLUSTER: Cluster<'static> = on_off_cluster::FULL_CLUSTER
        .with_revision(6)
        .with_features(on_off_cluster::Feature::LIGHTING.bits())
        .with_attrs(with!(
            required;
            on_off_cluster::AttributeId::OnOff
                | on_off_cluster::AttributeId::GlobalSceneControl
                | on_off_cluster::AttributeId::OnTime
                | on_off_cluster::AttributeId::OffWaitTime
                | on_off_cluster::AttributeId::StartUpOnOff
        ))
        .with_cmds(with!(
            on_off_cluster::CommandId::Off
                | on_off_cluster::CommandId::On
                | on_off_cluster::CommandId::Toggle
                | on_off_cluster::CommandId::OffWithEffect
                | on_off_cluster::CommandId::OnWithRecallGlobalScene
                | on_off_cluster::CommandId::OnWithTimedOff
        ));

    fn on_off(&self) -> bool {
        self.0.is_on()
    }

    fn set_on_off(&self, on: bool) {
        let label = if on { "ON" } else { "OFF" };
        match self.0.command(on) {
            Ok(()) => info!(
                "Output {} (GPIO{}) set to {label}",
                self.0.number(),
                self.0.gpio()
            ),
            Err(e) => error!(
                "Output {} (GPIO{}) {label} FAILED: {e}",
                self.0.number(),
                self.0.gpio()
            ),
        }
    }

    fn start_up_on_off(&self) -> Nullable<StartUpOnOffEnum> {
        Nullable::some(StartUpOnOffEnum::Off)
    }

    fn set_start_up_on_off(&self, _value: Nullable<StartUpOnOffEnum>) -> Result<(), Error> {
        Ok(())
    }

    async fn handle_off_with_effect(&self, _effect: EffectVariantEnum) {
        self.set_on_off(false);
    }
}
