//! Print everything the controller reports.
//!
//! ```text
//! cargo run --example serial -- [PORT] [name=volts ...]
//! ```
//!
//! Any `name=volts` arguments, e.g. `float_charging_voltage=13.8`, are written to the voltage
//! control group before the settings are printed.

use std::env;

use epever_modbus::{
    config::{ControllerConfig, Parity, SerialSettings},
    controller::ChargeController,
    retry::StdDelay,
    voltage_control::VoltageControlUpdate,
};
use inquire::Select;
use serialport::SerialPort;

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::ReadReady for PortWrapper {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        self.0
            .bytes_to_read()
            .map(|pending| pending > 0)
            .map_err(|e| IoError(e.into()))
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

fn open_port(name: &str, settings: &SerialSettings) -> serialport::Result<Box<dyn SerialPort>> {
    let parity = match settings.parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    };
    let data_bits = match settings.data_bits {
        5 => serialport::DataBits::Five,
        6 => serialport::DataBits::Six,
        7 => serialport::DataBits::Seven,
        _ => serialport::DataBits::Eight,
    };
    let stop_bits = match settings.stop_bits {
        2 => serialport::StopBits::Two,
        _ => serialport::StopBits::One,
    };

    serialport::new(name, settings.baud_rate)
        .data_bits(data_bits)
        .parity(parity)
        .stop_bits(stop_bits)
        .timeout(std::time::Duration::from_millis(u64::from(
            settings.timeout.to_millis(),
        )))
        .open()
}

/// Parse `name=volts` arguments into an update.
fn parse_update(args: &[String]) -> Result<VoltageControlUpdate, String> {
    let mut update = VoltageControlUpdate::new();
    for arg in args {
        let (name, volts) = arg
            .split_once('=')
            .ok_or_else(|| format!("Expected name=volts, got `{}`", arg))?;
        let volts: f64 = volts
            .parse()
            .map_err(|_| format!("`{}` is not a voltage", volts))?;
        update
            .set_by_name(name, volts)
            .map_err(|_| format!("Unknown voltage control parameter `{}`", name))?;
    }
    Ok(update)
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let (port_arg, update_args) = match args.first() {
        Some(first) if !first.contains('=') => (Some(first.clone()), &args[1..]),
        _ => (None, &args[..]),
    };

    let update = parse_update(update_args).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(2);
    });

    // Get serial port from command line arg or interactive selection
    let port_name = port_arg.unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let settings = SerialSettings::default();
    let port = open_port(&port_name, &settings).expect("Failed to open serial port");

    let mut controller =
        ChargeController::new_rtu(PortWrapper(port), StdDelay, ControllerConfig::default())
            .expect("Invalid controller configuration");

    if !update.is_empty() {
        controller
            .set_voltage_control(&update)
            .expect("Failed to update voltage control");
        println!("Voltage control updated");
    }

    println!("\n--- Real Time Data ---");
    println!("PV voltage: {:.2}V", controller.read_pv_voltage().unwrap());
    println!("PV current: {:.2}A", controller.read_pv_current().unwrap());
    println!("PV power: {:.2}W", controller.read_pv_power().unwrap());
    println!("Battery power: {:.2}W", controller.read_battery_power().unwrap());
    println!("Load voltage: {:.2}V", controller.read_load_voltage().unwrap());
    println!("Load current: {:.2}A", controller.read_load_current().unwrap());
    println!("Load power: {:.2}W", controller.read_load_power().unwrap());
    println!(
        "Battery temperature: {:.2}°C",
        controller.read_battery_temperature().unwrap()
    );
    println!(
        "Controller temperature: {:.2}°C",
        controller.read_controller_temperature().unwrap()
    );
    println!(
        "Remote battery temperature: {:.2}°C",
        controller.read_remote_battery_temperature().unwrap()
    );
    println!(
        "Battery SOC: {}%",
        controller.read_battery_state_of_charge().unwrap()
    );
    println!(
        "Battery real rated voltage: {:.2}V",
        controller.read_battery_real_rated_voltage().unwrap()
    );

    println!("\n--- Status ---");
    println!("{:#?}", controller.read_battery_status());
    println!("{:#?}", controller.read_charging_equipment_status());
    println!("{:#?}", controller.read_discharging_equipment_status());
    println!("Day time: {}", controller.is_day().unwrap());
    println!(
        "Device over temperature: {}",
        controller.is_device_over_temperature().unwrap()
    );

    println!("\n--- Statistics ---");
    println!(
        "PV voltage today: {:.2}V - {:.2}V",
        controller.read_minimum_pv_voltage_today().unwrap(),
        controller.read_maximum_pv_voltage_today().unwrap()
    );
    println!(
        "Battery voltage today: {:.2}V - {:.2}V",
        controller.read_minimum_battery_voltage_today().unwrap(),
        controller.read_maximum_battery_voltage_today().unwrap()
    );
    println!(
        "Consumed energy: {:.2}kWh today, {:.2}kWh this month, {:.2}kWh this year, {:.2}kWh total",
        controller.read_consumed_energy_today().unwrap(),
        controller.read_consumed_energy_this_month().unwrap(),
        controller.read_consumed_energy_this_year().unwrap(),
        controller.read_total_consumed_energy().unwrap()
    );
    println!(
        "Generated energy: {:.2}kWh today, {:.2}kWh this month, {:.2}kWh this year, {:.2}kWh total",
        controller.read_generated_energy_today().unwrap(),
        controller.read_generated_energy_this_month().unwrap(),
        controller.read_generated_energy_this_year().unwrap(),
        controller.read_total_generated_energy().unwrap()
    );
    println!("Battery voltage: {:.2}V", controller.read_battery_voltage().unwrap());
    println!("Battery current: {:.2}A", controller.read_battery_current().unwrap());

    println!("\n--- Battery Parameters ---");
    println!(
        "Rated charging current: {:.2}A",
        controller.get_rated_charging_current().unwrap()
    );
    println!(
        "Rated load current: {:.2}A",
        controller.get_rated_load_current().unwrap()
    );
    println!("Battery type: {}", controller.get_battery_type().unwrap());
    println!(
        "Battery capacity: {}Ah",
        controller.get_battery_capacity().unwrap()
    );
    println!(
        "Temperature compensation coefficient: {:.2}mV/°C/2V",
        controller.get_temperature_compensation_coefficient().unwrap()
    );
    for (register, volts) in controller.get_voltage_control().unwrap().iter() {
        println!("{}: {:.2}V", register, volts);
    }
    println!(
        "Battery rated voltage: {}",
        controller.get_battery_rated_voltage().unwrap()
    );
    println!(
        "Default load state in manual mode: {}",
        controller.get_default_load_state().unwrap()
    );
    println!(
        "Equalize duration: {} min",
        controller.get_equalize_duration().unwrap().to_minutes()
    );
    println!(
        "Boost duration: {} min",
        controller.get_boost_duration().unwrap().to_minutes()
    );
    println!(
        "Battery discharge: {}%",
        controller.get_battery_discharge().unwrap()
    );
    println!("Battery charge: {}%", controller.get_battery_charge().unwrap());
    println!("Charging mode: {}", controller.get_charging_mode().unwrap());
    match controller.get_rtc().unwrap() {
        Some(timestamp) => println!("Controller clock: {}", timestamp),
        None => println!("Controller clock: not set"),
    }
}
