//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `http_store`   | ScheduleStore      | Medicine server JSON API    |
//! |                | NotificationSender | Emergency notification API  |
//! | `memory_store` | ScheduleStore      | JSON fixture (simulation)   |
//! | `config_file`  | ConfigPort         | JSON config file            |
//! | `log_sink`     | NoticeSink         | Log output                  |
//! | `time`         | Clock              | `Instant` + local time zone |
//! | `sim_hw`       | SetDutyCycle       | Simulated servo PWM         |
//! |                | DelayNs            | `thread::sleep`             |
//! | `stdin_input`  | (input source)     | Keyboard as push buttons    |

pub mod config_file;
pub mod http_store;
pub mod log_sink;
pub mod memory_store;
pub mod sim_hw;
pub mod stdin_input;
pub mod time;
