#[cfg(target_os = "espidf")]
mod config;

#[cfg(target_os = "espidf")]
static BUILD_TIMESTAMP: &str = env!("VERGEN_BUILD_TIMESTAMP");
#[cfg(target_os = "espidf")]
static RUSTC_VERSION: &str = env!("VERGEN_RUSTC_SEMVER");

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use embedded_hal::delay::DelayNs;
    use esp_idf_svc::hal::delay::FreeRtos;
    use log::{error, info};
    use si7021_rs::helpers::EspI2cBus;
    use si7021_rs::si7021::{self, Si7021};
    use si7021_rs::si7021_i2c::{self, BusConfig, DriverArgs};

    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::set_max_level(log::LevelFilter::Info);

    info!(
        "Basic init done. Built on {} with Rustc {}.",
        &BUILD_TIMESTAMP, &RUSTC_VERSION
    );

    let bus_config = BusConfig::default()
        .pins(config::SDA_GPIO, config::SCL_GPIO)
        .clock_speed(config::CLOCK_SPEED_HZ);
    let args = si7021::CreateArgs::default().with_i2c(
        si7021_i2c::CreateArgs::default()
            .with_port(config::I2C_PORT)
            .with_retry_timeout(config::RETRY_TIMEOUT)
            .with_driver(DriverArgs {
                config: bus_config,
                ..DriverArgs::default()
            }),
    );

    let mut sensor = Si7021::create(
        &args,
        EspI2cBus::new(config::TRANSACTION_TIMEOUT),
        FreeRtos,
    )
    .map_err(|(e, _)| anyhow::anyhow!("Could not create Si7021: {e}"))?;

    loop {
        match sensor.measure_rh_and_temp() {
            Ok(measurement) => info!(
                "RH: {:.2} % | Temp: {:.2} °C",
                measurement.rh_percent, measurement.temp_celsius
            ),
            Err(e) => error!("Measurement failed: {e}"),
        }
        FreeRtos.delay_ms(config::SAMPLE_PERIOD_MS);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("this firmware only runs on ESP-IDF targets")
}
