fn main() {
    // Only the firmware build links against ESP-IDF; host test builds skip the
    // toolchain environment entirely.
    if std::env::var("CARGO_FEATURE_ESP_IDF").is_ok() {
        embuild::espidf::sysenv::output();
    }
}
