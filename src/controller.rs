use chrono::NaiveDateTime;
use embedded_hal::delay::DelayNs;
use fugit::SecsDurationU32;
use strum::EnumCount;

use crate::{
    config::ControllerConfig,
    error::{Error, Result},
    register::{
        BatteryRatedVoltage, BatteryType, ChargingMode, DefaultLoadState, Flag, Quantity,
        RegisterCode, RegisterWidth,
    },
    retry::{RetryPolicy, retry},
    rtc::{self, RTC_BASE_ADDRESS, RTC_REGISTER_COUNT},
    status::{
        BatteryStatus, ChargingEquipmentStatus, DischargingEquipmentStatus, StatusRecord,
    },
    transport::{BitKind, RegisterKind, RtuTransport, SerialInterface, Transport},
    voltage_control::{
        VOLTAGE_CONTROL_BASE, VoltageControl, VoltageControlRegister, VoltageControlUpdate,
    },
};

/// You can create a ChargeController using any [`Transport`], most commonly an [`RtuTransport`]
/// over a serial interface, see [`ChargeController::new_rtu`].
///
/// For its methods, we generally use the nomenclature that "set" means to write a configuration
/// and "get" means to read back a configuration value. Where as "read" means to get a measured
/// value.
///
/// Every transport exchange is retried according to the [`RetryPolicy`], waiting on `D` between
/// attempts. Nothing is cached: every call performs fresh transactions.
pub struct ChargeController<T: Transport, D: DelayNs> {
    transport: T,
    delay: D,
    policy: RetryPolicy,
}

impl<S: SerialInterface, D: DelayNs> ChargeController<RtuTransport<S>, D> {
    /// Create a controller talking Modbus RTU over `interface`.
    ///
    /// Fails with [`Error::InvalidUnitId`] when the configured unit id is not a valid slave
    /// address.
    pub fn new_rtu(
        interface: S,
        delay: D,
        config: ControllerConfig,
    ) -> Result<Self, <RtuTransport<S> as Transport>::Error> {
        config.validate().map_err(Error::InvalidUnitId)?;
        Ok(Self::new(
            RtuTransport::new(interface, config.unit_id),
            delay,
            config.retry,
        ))
    }
}

impl<T: Transport, D: DelayNs> ChargeController<T, D> {
    pub fn new(transport: T, delay: D, policy: RetryPolicy) -> Self {
        Self {
            transport,
            delay,
            policy,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Give back the transport and delay provider.
    pub fn release(self) -> (T, D) {
        (self.transport, self.delay)
    }

    // Real-time data.

    /// Return the solar panel voltage in volts.
    pub fn read_pv_voltage(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::PvVoltage)
    }

    /// Return the solar panel current in amps.
    pub fn read_pv_current(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::PvCurrent)
    }

    /// Return the solar panel power in watts.
    pub fn read_pv_power(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::PvPower)
    }

    /// Return the battery charging power in watts.
    pub fn read_battery_power(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::BatteryPower)
    }

    /// Return the load output voltage in volts.
    pub fn read_load_voltage(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::LoadVoltage)
    }

    /// Return the load output current in amps.
    pub fn read_load_current(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::LoadCurrent)
    }

    /// Return the load output power in watts.
    pub fn read_load_power(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::LoadPower)
    }

    /// Return the battery temperature in degrees celsius.
    pub fn read_battery_temperature(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::BatteryTemperature)
    }

    /// Return the temperature inside the controller in degrees celsius.
    pub fn read_controller_temperature(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::ControllerTemperature)
    }

    /// Return the battery state of charge in percent.
    pub fn read_battery_state_of_charge(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::BatteryStateOfCharge)
    }

    /// Return the temperature reported by the remote sensor in degrees celsius.
    pub fn read_remote_battery_temperature(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::RemoteBatteryTemperature)
    }

    /// Return the battery's current system voltage class in volts, e.g. `24.0`.
    pub fn read_battery_real_rated_voltage(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::BatteryRealRatedVoltage)
    }

    pub fn read_battery_status(&mut self) -> Result<BatteryStatus, T::Error> {
        self.read_status()
    }

    /// See [`ChargingEquipmentStatus::fault`] for a caveat on the fault bit.
    pub fn read_charging_equipment_status(&mut self) -> Result<ChargingEquipmentStatus, T::Error> {
        self.read_status()
    }

    pub fn read_discharging_equipment_status(
        &mut self,
    ) -> Result<DischargingEquipmentStatus, T::Error> {
        self.read_status()
    }

    pub fn is_device_over_temperature(&mut self) -> Result<bool, T::Error> {
        self.read_flag(Flag::DeviceOverTemperature)
    }

    pub fn is_night(&mut self) -> Result<bool, T::Error> {
        self.read_flag(Flag::Night)
    }

    pub fn is_day(&mut self) -> Result<bool, T::Error> {
        Ok(!self.is_night()?)
    }

    // Statistics.

    pub fn read_maximum_pv_voltage_today(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::MaximumPvVoltageToday)
    }

    pub fn read_minimum_pv_voltage_today(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::MinimumPvVoltageToday)
    }

    pub fn read_maximum_battery_voltage_today(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::MaximumBatteryVoltageToday)
    }

    pub fn read_minimum_battery_voltage_today(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::MinimumBatteryVoltageToday)
    }

    /// Return the energy consumed by the load today in kWh.
    pub fn read_consumed_energy_today(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::ConsumedEnergyToday)
    }

    pub fn read_consumed_energy_this_month(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::ConsumedEnergyThisMonth)
    }

    pub fn read_consumed_energy_this_year(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::ConsumedEnergyThisYear)
    }

    pub fn read_total_consumed_energy(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::TotalConsumedEnergy)
    }

    /// Return the energy generated by the solar panels today in kWh.
    pub fn read_generated_energy_today(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::GeneratedEnergyToday)
    }

    pub fn read_generated_energy_this_month(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::GeneratedEnergyThisMonth)
    }

    pub fn read_generated_energy_this_year(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::GeneratedEnergyThisYear)
    }

    pub fn read_total_generated_energy(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::TotalGeneratedEnergy)
    }

    /// Return the battery voltage in volts.
    pub fn read_battery_voltage(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::BatteryVoltage)
    }

    /// Return the battery current in amps. Positive while charging, negative while discharging.
    pub fn read_battery_current(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::BatteryCurrent)
    }

    // Rated data.

    /// Return the rated charging current in amps.
    pub fn get_rated_charging_current(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::RatedChargingCurrent)
    }

    /// Return the rated load current in amps.
    pub fn get_rated_load_current(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::RatedLoadCurrent)
    }

    // Settings.

    pub fn get_battery_type(&mut self) -> Result<BatteryType, T::Error> {
        self.read_code()
    }

    /// Return the battery capacity in amp hours.
    pub fn get_battery_capacity(&mut self) -> Result<u16, T::Error> {
        self.read_raw(Quantity::BatteryCapacity)
    }

    /// Configure the battery capacity in amp hours.
    pub fn set_battery_capacity(&mut self, capacity_ah: u16) -> Result<(), T::Error> {
        log::debug!("setting battery capacity to {}Ah", capacity_ah);
        self.write_register(Quantity::BatteryCapacity.descriptor().address, capacity_ah)
    }

    /// Return the temperature compensation coefficient in mV/°C/2V.
    pub fn get_temperature_compensation_coefficient(&mut self) -> Result<f64, T::Error> {
        self.read_quantity(Quantity::TemperatureCompensationCoefficient)
    }

    /// Configure the temperature compensation coefficient in mV/°C/2V, e.g. `3.0`.
    pub fn set_temperature_compensation_coefficient(
        &mut self,
        coefficient: f64,
    ) -> Result<(), T::Error> {
        self.write_quantity(Quantity::TemperatureCompensationCoefficient, coefficient)
    }

    /// Read the whole voltage control group.
    pub fn get_voltage_control(&mut self) -> Result<VoltageControl, T::Error> {
        let mut raw = [0u16; VoltageControlRegister::COUNT];
        self.read_registers(RegisterKind::Holding, VOLTAGE_CONTROL_BASE, &mut raw)?;
        Ok(VoltageControl::from_registers(raw))
    }

    /// Read a single parameter of the voltage control group, in volts.
    pub fn get_voltage_control_value(
        &mut self,
        register: VoltageControlRegister,
    ) -> Result<f64, T::Error> {
        let descriptor = register.descriptor();
        let mut raw = [0u16; 1];
        self.read_registers(descriptor.kind, descriptor.address, &mut raw)?;
        Ok(descriptor.decode([raw[0], 0]))
    }

    /// Change some parameters of the voltage control group.
    ///
    /// The controller only accepts the group as a whole, so this reads the current group,
    /// overlays `update` and writes all twelve registers back: exactly one read followed by one
    /// write. The two are separate transactions; anything else writing the group in between will
    /// have its change overwritten.
    ///
    /// An empty update, or one holding a value the registers cannot store, fails before anything
    /// is sent.
    pub fn set_voltage_control(&mut self, update: &VoltageControlUpdate) -> Result<(), T::Error> {
        if update.is_empty() {
            return Err(Error::EmptyUpdate);
        }
        update.validate()?;

        let mut group = self.get_voltage_control()?;
        group.apply(update);
        let (start_address, write_buffer) = group.generate_write_data_and_offset()?;

        log::debug!("writing voltage control group {:?}", write_buffer);
        self.write_registers(start_address, &write_buffer)
    }

    /// [`Self::set_voltage_control`] keyed by parameter names, e.g.
    /// `[("float_charging_voltage", 13.8)]`.
    ///
    /// Fails with [`Error::UnknownParameter`] before anything is sent if a name is not one of the
    /// twelve parameters.
    pub fn set_voltage_control_by_name(&mut self, values: &[(&str, f64)]) -> Result<(), T::Error> {
        let mut update = VoltageControlUpdate::new();
        for (name, volts) in values {
            update.set_by_name(name, *volts)?;
        }
        self.set_voltage_control(&update)
    }

    pub fn get_battery_rated_voltage(&mut self) -> Result<BatteryRatedVoltage, T::Error> {
        self.read_code()
    }

    /// Return the load state used when the load is in manual mode.
    pub fn get_default_load_state(&mut self) -> Result<DefaultLoadState, T::Error> {
        self.read_code()
    }

    pub fn get_equalize_duration(&mut self) -> Result<SecsDurationU32, T::Error> {
        let minutes = self.read_raw(Quantity::EqualizeDuration)?;
        Ok(SecsDurationU32::minutes(u32::from(minutes)))
    }

    pub fn get_boost_duration(&mut self) -> Result<SecsDurationU32, T::Error> {
        let minutes = self.read_raw(Quantity::BoostDuration)?;
        Ok(SecsDurationU32::minutes(u32::from(minutes)))
    }

    /// Return the depth of discharge in percent.
    pub fn get_battery_discharge(&mut self) -> Result<u16, T::Error> {
        self.read_raw(Quantity::BatteryDischarge)
    }

    /// Return the depth of charge in percent.
    pub fn get_battery_charge(&mut self) -> Result<u16, T::Error> {
        self.read_raw(Quantity::BatteryCharge)
    }

    pub fn get_charging_mode(&mut self) -> Result<ChargingMode, T::Error> {
        self.read_code()
    }

    /// Read the controller's clock.
    ///
    /// Returns `Ok(None)` when the clock holds an invalid date or time, e.g. after losing power.
    pub fn get_rtc(&mut self) -> Result<Option<NaiveDateTime>, T::Error> {
        let mut raw = [0u16; RTC_REGISTER_COUNT];
        self.read_registers(RegisterKind::Holding, RTC_BASE_ADDRESS, &mut raw)?;
        let timestamp = rtc::decode(raw);
        if timestamp.is_none() {
            log::debug!("clock registers {:04X?} are not a valid timestamp", raw);
        }
        Ok(timestamp)
    }

    /// Set the controller's clock. The value is not read back.
    ///
    /// Only years 2000 to 2255 can be stored.
    pub fn set_rtc(&mut self, timestamp: &NaiveDateTime) -> Result<(), T::Error> {
        let raw = rtc::encode(timestamp).ok_or(Error::OutOfRange {
            register: RTC_BASE_ADDRESS + 2,
        })?;
        self.write_registers(RTC_BASE_ADDRESS, &raw)
    }

    // Register codec.

    /// Read and decode a quantity into engineering units.
    ///
    /// Status words and code settings fail with [`Error::NotNumeric`] without touching the bus.
    pub fn read_quantity(&mut self, quantity: Quantity) -> Result<f64, T::Error> {
        if !quantity.is_numeric() {
            return Err(Error::NotNumeric(quantity.name()));
        }
        let descriptor = quantity.descriptor();
        let mut raw = [0u16; 2];
        self.read_registers(
            descriptor.kind,
            descriptor.address,
            &mut raw[..descriptor.width.count()],
        )?;
        let value = descriptor.decode(raw);
        log::trace!("{} = {}", quantity.name(), value);
        Ok(value)
    }

    /// Read a setting stored as a code and look it up.
    pub fn read_code<C: RegisterCode>(&mut self) -> Result<C, T::Error> {
        let raw = self.read_raw(C::QUANTITY)?;
        C::from_code(raw).ok_or(Error::Decode {
            register: C::QUANTITY.descriptor().address,
            field: C::QUANTITY.name(),
            value: raw,
        })
    }

    /// Read and decode a status register.
    pub fn read_status<R: StatusRecord>(&mut self) -> Result<R, T::Error> {
        let raw = self.read_raw(R::QUANTITY)?;
        Ok(R::decode(raw)?)
    }

    pub fn read_flag(&mut self, flag: Flag) -> Result<bool, T::Error> {
        let (kind, address) = flag.location();
        self.read_bit(kind, address)
    }

    /// Raw contents of a single register quantity.
    fn read_raw(&mut self, quantity: Quantity) -> Result<u16, T::Error> {
        let descriptor = quantity.descriptor();
        debug_assert_eq!(descriptor.width, RegisterWidth::Single);
        let mut raw = [0u16; 1];
        self.read_registers(descriptor.kind, descriptor.address, &mut raw)?;
        log::trace!("{} = {:#06X}", quantity.name(), raw[0]);
        Ok(raw[0])
    }

    fn write_quantity(&mut self, quantity: Quantity, value: f64) -> Result<(), T::Error> {
        let descriptor = quantity.descriptor();
        let raw = descriptor.encode(value).ok_or(Error::OutOfRange {
            register: descriptor.address,
        })?;
        log::debug!("setting {} to {} (raw {})", quantity.name(), value, raw);
        self.write_register(descriptor.address, raw)
    }

    // Retried transport operations.

    pub fn read_registers(
        &mut self,
        kind: RegisterKind,
        address: u16,
        values: &mut [u16],
    ) -> Result<(), T::Error> {
        let Self {
            transport,
            delay,
            policy,
        } = self;
        retry(policy, delay, || {
            transport.read_registers(kind, address, &mut *values)
        })
    }

    pub fn read_bit(&mut self, kind: BitKind, address: u16) -> Result<bool, T::Error> {
        let Self {
            transport,
            delay,
            policy,
        } = self;
        retry(policy, delay, || transport.read_bit(kind, address))
    }

    pub fn write_register(&mut self, address: u16, value: u16) -> Result<(), T::Error> {
        let Self {
            transport,
            delay,
            policy,
        } = self;
        retry(policy, delay, || transport.write_register(address, value))
    }

    pub fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<(), T::Error> {
        let Self {
            transport,
            delay,
            policy,
        } = self;
        retry(policy, delay, || transport.write_registers(address, values))
    }
}
