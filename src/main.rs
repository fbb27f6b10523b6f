//! Matter/Thread digital I/O bridge for ESP32-C6
//!
//! Exposes four contact-sensor inputs and four on/off outputs over Matter,
//! using Thread as the transport and BLE for commissioning.
//! Holding the BOOT button for five seconds performs a factory reset.

#![allow(unexpected_cfgs)]
#![recursion_limit = "256"]

// Only the chip build drives these; the host build compiles them for tests.
#[cfg_attr(not(any(esp32c6, esp32h2)), allow(dead_code))]
mod config;
#[cfg_attr(not(any(esp32c6, esp32h2)), allow(dead_code))]
mod indicator;
#[cfg_attr(not(any(esp32c6, esp32h2)), allow(dead_code))]
mod input;
#[cfg_attr(not(any(esp32c6, esp32h2)), allow(dead_code))]
mod output;
#[cfg_attr(not(any(esp32c6, esp32h2)), allow(dead_code))]
mod reset;

#[cfg(any(esp32c6, esp32h2))]
mod endpoints;
#[cfg(any(esp32c6, esp32h2))]
mod gpio;

fn main() -> Result<(), anyhow::Error> {
    #[cfg(any(esp32c6, esp32h2))]
    {
        bridge::main()
    }

    #[cfg(not(any(esp32c6, esp32h2)))]
    panic!("This firmware is only supported on ESP32-C6 and ESP32-H2 chips.");
}

#[cfg(any(esp32c6, esp32h2))]
mod bridge {
    use core::cell::Cell;
    use core::pin::pin;

    use alloc::sync::Arc;

    use embassy_futures::select::{select4, Either4};
    use embassy_time::{Duration, Instant, Timer};

    use esp_idf_matter::init_async_io;
    use esp_idf_matter::matter::dm::clusters::basic_info::BasicInfoConfig;
    use esp_idf_matter::matter::dm::clusters::desc::{ClusterHandler as _, DescHandler};
    use esp_idf_matter::matter::dm::clusters::on_off::{self, OnOffHandler, OnOffHooks};
    use esp_idf_matter::matter::dm::devices::test::{TEST_DEV_ATT, TEST_DEV_COMM, TEST_DEV_DET};
    use esp_idf_matter::matter::dm::devices::DEV_TYPE_ON_OFF_LIGHT;
    use esp_idf_matter::matter::dm::{
        Async, Cluster, Dataver, DeviceType, EmptyHandler, Endpoint, EpClMatcher, Node,
    };
    use esp_idf_matter::matter::utils::init::InitMaybeUninit;
    use esp_idf_matter::matter::{clusters, devices};
    use esp_idf_matter::persist::EspKvBlobStore;
    use esp_idf_matter::wireless::{EspMatterThread, EspThreadMatterStack};

    use esp_idf_svc::bt::reduce_bt_memory;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::reset::restart;
    use esp_idf_svc::hal::task::block_on;
    use esp_idf_svc::hal::task::thread::ThreadSpawnConfiguration;
    use esp_idf_svc::io::vfs::MountedEventfs;
    use esp_idf_svc::log::EspLogger;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sys::{
        esp, esp_openthread_get_instance, esp_openthread_lock_acquire,
        esp_openthread_lock_release, nvs_flash_erase, otDeviceRole_OT_DEVICE_ROLE_CHILD,
        otDeviceRole_OT_DEVICE_ROLE_DETACHED, otDeviceRole_OT_DEVICE_ROLE_LEADER,
        otDeviceRole_OT_DEVICE_ROLE_ROUTER, otThreadGetDeviceRole,
    };

    use log::{error, info, LevelFilter};

    use static_cell::StaticCell;

    use crate::config::{
        input_endpoint, output_endpoint, DEBOUNCE_SAMPLES, INPUTS, INPUT_COUNT, INPUT_POLL_MS,
        LED_TICK_MS, LONG_PRESS_MS, OUTPUTS, OUTPUT_COUNT, PRODUCT_NAME, RESET_BUTTON_GPIO,
        RESET_POLL_MS, STATUS_LED, VENDOR_NAME,
    };
    use crate::endpoints::{
        boolean_state::ClusterHandler as _, ContactSensor, ContactSensorHandler, OutputSwitch,
        CONTACT_CLUSTER, DEV_TYPE_CONTACT_SENSOR,
    };
    use crate::gpio::{self, EspGpio};
    use crate::indicator::{DeviceRole, Indicator};
    use crate::input::InputBank;
    use crate::output::OutputChannel;
    use crate::reset::{LongPress, PressEvent};

    extern crate alloc;

    const STACK_SIZE: usize = 24 * 1024;
    const BUMP_SIZE: usize = 13500;

    type Stack = EspThreadMatterStack<BUMP_SIZE, ()>;

    static MATTER_STACK: StaticCell<Stack> = StaticCell::new();

    const BASIC_INFO: BasicInfoConfig = BasicInfoConfig {
        vendor_name: VENDOR_NAME,
        product_name: PRODUCT_NAME,
        device_name: PRODUCT_NAME,
        ..TEST_DEV_DET
    };

    const CONTACT_DEVICE_TYPES: &[DeviceType] = devices!(DEV_TYPE_CONTACT_SENSOR);
    const CONTACT_CLUSTERS: &[Cluster<'static>] = clusters!(DescHandler::CLUSTER, CONTACT_CLUSTER);

    const LIGHT_DEVICE_TYPES: &[DeviceType] = devices!(DEV_TYPE_ON_OFF_LIGHT);
    const LIGHT_CLUSTERS: &[Cluster<'static>] =
        clusters!(DescHandler::CLUSTER, OutputSwitch::CLUSTER);

    const fn contact_endpoint(index: usize) -> Endpoint<'static> {
        Endpoint {
            id: input_endpoint(index),
            device_types: CONTACT_DEVICE_TYPES,
            clusters: CONTACT_CLUSTERS,
        }
    }

    const fn light_endpoint(index: usize) -> Endpoint<'static> {
        Endpoint {
            id: output_endpoint(index),
            device_types: LIGHT_DEVICE_TYPES,
            clusters: LIGHT_CLUSTERS,
        }
    }

    // `NODE` and the handler chain in `matter()` list every endpoint by hand.
    const _: () = assert!(INPUT_COUNT == 4 && OUTPUT_COUNT == 4);

    /// Log targets of the Matter stack, kept at warnings and above.
    const QUIET_TARGETS: &[&str] = &["rs_matter", "rs_matter_stack", "esp_idf_matter"];

    /// How the Matter future ended.
    enum Exit {
        Finished,
        FactoryReset,
    }

    const NODE: Node = Node {
        id: 0,
        endpoints: &[
            EspThreadMatterStack::<0, ()>::root_endpoint(),
            contact_endpoint(0),
            contact_endpoint(1),
            contact_endpoint(2),
            contact_endpoint(3),
            light_endpoint(0),
            light_endpoint(1),
            light_endpoint(2),
            light_endpoint(3),
        ],
    };

    /// Chains a contact sensor's BooleanState and Descriptor clusters.
    macro_rules! contact {
        ($handler:expr, $stack:expr, $contacts:expr, $index:literal) => {
            $handler
                .chain(
                    EpClMatcher::new(Some(input_endpoint($index)), Some(CONTACT_CLUSTER.id)),
                    Async(ContactSensorHandler(&$contacts[$index]).adapt()),
                )
                .chain(
                    EpClMatcher::new(Some(input_endpoint($index)), Some(DescHandler::CLUSTER.id)),
                    Async(DescHandler::new(Dataver::new_rand($stack.matter().rand())).adapt()),
                )
        };
    }

    /// Chains an output's OnOff and Descriptor clusters.
    macro_rules! switch {
        ($handler:expr, $stack:expr, $switches:expr, $index:literal) => {
            $handler
                .chain(
                    EpClMatcher::new(Some(output_endpoint($index)), Some(OutputSwitch::CLUSTER.id)),
                    on_off::HandlerAsyncAdaptor(&$switches[$index]),
                )
                .chain(
                    EpClMatcher::new(Some(output_endpoint($index)), Some(DescHandler::CLUSTER.id)),
                    Async(DescHandler::new(Dataver::new_rand($stack.matter().rand())).adapt()),
                )
        };
    }

    pub fn main() -> Result<(), anyhow::Error> {
        esp_idf_svc::log::init_from_env();

        for target in QUIET_TARGETS {
            EspLogger.set_target_level(*target, LevelFilter::Warn)?;
        }

        info!("Starting Matter GPIO bridge...");

        ThreadSpawnConfiguration::set(&ThreadSpawnConfiguration {
            name: Some(c"matter"),
            ..Default::default()
        })?;

        let thread = std::thread::Builder::new()
            .stack_size(STACK_SIZE)
            .spawn(run)
            .unwrap();

        thread.join().unwrap()
    }

    #[inline(never)]
    #[cold]
    fn run() -> Result<(), anyhow::Error> {
        let result = block_on(matter());

        match &result {
            Err(e) => error!("Matter aborted execution with error: {e:?}"),
            Ok(Exit::FactoryReset) => return erase_and_restart(),
            Ok(Exit::Finished) => info!("Matter finished execution successfully"),
        }

        result.map(|_| ())
    }

    async fn matter() -> Result<Exit, anyhow::Error> {
        let stack = MATTER_STACK
            .uninit()
            .init_with(EspThreadMatterStack::init_default(
                &BASIC_INFO,
                TEST_DEV_COMM,
                &TEST_DEV_ATT,
            ));

        info!("Matter initialized");

        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;
        let mut peripherals = Peripherals::take()?;

        let mounted_event_fs = Arc::new(MountedEventfs::mount(6)?);
        init_async_io(mounted_event_fs.clone())?;

        reduce_bt_memory(unsafe { peripherals.modem.reborrow() })?;

        info!("Basics initialized");

        configure_pins()?;

        let mut inputs = InputBank::new(&INPUTS, DEBOUNCE_SAMPLES);
        let contacts: [ContactSensor; INPUT_COUNT] = core::array::from_fn(|index| {
            ContactSensor::new(
                Dataver::new_rand(stack.matter().rand()),
                inputs.channels()[index].level(),
            )
        });

        let switches = core::array::from_fn::<_, OUTPUT_COUNT, _>(|index| {
            OnOffHandler::new_standalone(
                Dataver::new_rand(stack.matter().rand()),
                output_endpoint(index),
                OutputSwitch::new(index, OUTPUTS[index]),
            )
        });

        let handler = EmptyHandler;
        let handler = contact!(handler, stack, contacts, 0);
        let handler = contact!(handler, stack, contacts, 1);
        let handler = contact!(handler, stack, contacts, 2);
        let handler = contact!(handler, stack, contacts, 3);
        let handler = switch!(handler, stack, switches, 0);
        let handler = switch!(handler, stack, switches, 1);
        let handler = switch!(handler, stack, switches, 2);
        let handler = switch!(handler, stack, switches, 3);

        info!("Handler initialized");

        let kvs = EspKvBlobStore::new_default(nvs.clone())?;
        let persist = stack.create_persist_with_comm_window(kvs).await?;

        let mut matter = pin!(stack.run_coex(
            EspMatterThread::new(peripherals.modem, sysloop, nvs, mounted_event_fs, stack),
            &persist,
            (NODE, handler),
            (),
        ));

        let factory_reset = Cell::new(false);

        let mut poller = pin!(poll_inputs(stack, &mut inputs, &contacts));
        let mut button = pin!(watch_reset_button(&factory_reset));
        let mut led = pin!(drive_status_led(stack, &factory_reset));

        info!("About to run Matter");

        // Returning drops the stack's futures and the persister, which
        // releases their NVS handles before the erase in `run()`.
        match select4(&mut matter, &mut poller, &mut button, &mut led).await {
            Either4::First(result) => result?,
            Either4::Third(result) => {
                result?;
                return Ok(Exit::FactoryReset);
            }
            Either4::Second(result) | Either4::Fourth(result) => result?,
        }

        Ok(Exit::Finished)
    }

    fn configure_pins() -> Result<(), anyhow::Error> {
        gpio::configure_outputs(
            OUTPUTS
                .iter()
                .map(|pin| pin.gpio)
                .chain([STATUS_LED.gpio]),
        )?;

        for pin in OUTPUTS {
            OutputChannel::new(pin).drive(&EspGpio, false)?;
        }
        OutputChannel::new(STATUS_LED).drive(&EspGpio, false)?;

        gpio::configure_inputs(
            INPUTS
                .iter()
                .map(|pin| pin.gpio)
                .chain([RESET_BUTTON_GPIO]),
        )?;

        info!("GPIOs configured:");
        for (index, pin) in INPUTS.iter().enumerate() {
            info!(
                "  Input {} (GPIO{}) -> endpoint {}",
                index + 1,
                pin.gpio,
                input_endpoint(index)
            );
        }
        for (index, pin) in OUTPUTS.iter().enumerate() {
            info!(
                "  Output {} (GPIO{}) -> endpoint {}",
                index + 1,
                pin.gpio,
                output_endpoint(index)
            );
        }
        info!(
            "  Reset button: GPIO{RESET_BUTTON_GPIO}, status LED: GPIO{}",
            STATUS_LED.gpio
        );

        Ok(())
    }

    async fn poll_inputs(
        stack: &Stack,
        inputs: &mut InputBank<INPUT_COUNT>,
        contacts: &[ContactSensor; INPUT_COUNT],
    ) -> Result<(), anyhow::Error> {
        loop {
            let mut changed = false;

            inputs.poll(gpio::read_level, |index, level| {
                info!(
                    "Input {} (GPIO{}) changed to {}",
                    index + 1,
                    INPUTS[index].gpio,
                    if level { "HIGH (open)" } else { "LOW (closed)" }
                );

                changed |= contacts[index].set(level);
            });

            if changed {
                stack.notify_changed();
            }

            Timer::after(Duration::from_millis(INPUT_POLL_MS)).await;
        }
    }

    async fn watch_reset_button(factory_reset: &Cell<bool>) -> Result<(), anyhow::Error> {
        let mut button = LongPress::new(LONG_PRESS_MS);

        info!("Reset button registered on GPIO{RESET_BUTTON_GPIO}");

        loop {
            let pressed = !gpio::read_level(RESET_BUTTON_GPIO);

            match button.update(pressed, RESET_POLL_MS as u32) {
                Some(PressEvent::Pressed) => info!(
                    "Reset button pressed, hold for {} seconds to factory reset",
                    LONG_PRESS_MS / 1000
                ),
                Some(PressEvent::ReleasedEarly { held_ms }) => info!(
                    "Button released too early ({:.1} seconds)",
                    held_ms as f32 / 1000.0
                ),
                Some(PressEvent::LongPress) => {
                    info!("Factory reset initiated");
                    factory_reset.set(true);

                    // Let the LED show the reset pattern
                    Timer::after(Duration::from_secs(1)).await;

                    return Ok(());
                }
                None => (),
            }

            Timer::after(Duration::from_millis(RESET_POLL_MS)).await;
        }
    }

    fn erase_and_restart() -> Result<(), anyhow::Error> {
        info!("Matter stopped, performing factory reset");

        esp!(unsafe { nvs_flash_erase() })?;

        restart()
    }

    async fn drive_status_led(stack: &Stack, factory_reset: &Cell<bool>) -> Result<(), anyhow::Error> {
        let led = OutputChannel::new(STATUS_LED);
        let started = Instant::now();
        let mut indicator = Indicator::new(DeviceRole::Uncommissioned, 0);

        loop {
            let now = started.elapsed().as_millis();

            let previous = indicator.role();
            if indicator.set_role(current_role(stack, factory_reset.get()), now) {
                if DeviceRole::completes_commissioning(previous, indicator.role()) {
                    info!("Commissioning complete");
                }
                info!("Device role: {:?}", indicator.role());
            }

            led.drive(&EspGpio, indicator.level(now))?;

            Timer::after(Duration::from_millis(LED_TICK_MS)).await;
        }
    }

    fn current_role(stack: &Stack, factory_reset: bool) -> DeviceRole {
        DeviceRole::resolve(factory_reset, stack.matter().is_commissioned(), thread_role)
    }

    fn thread_role() -> DeviceRole {
        let role = unsafe {
            let instance = esp_openthread_get_instance();
            if instance.is_null() {
                return DeviceRole::Disabled;
            }

            esp_openthread_lock_acquire(u32::MAX);
            let role = otThreadGetDeviceRole(instance);
            esp_openthread_lock_release();

            role
        };

        match role {
            otDeviceRole_OT_DEVICE_ROLE_DETACHED => DeviceRole::Detached,
            otDeviceRole_OT_DEVICE_ROLE_CHILD => DeviceRole::Child,
            otDeviceRole_OT_DEVICE_ROLE_ROUTER => DeviceRole::Router,
            otDeviceRole_OT_DEVICE_ROLE_LEADER => DeviceRole::Leader,
            _ => DeviceRole::Disabled,
        }
    }
}
