fn main() {
    // Only the firmware image needs the ESP-IDF environment; host builds and
    // tests skip it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
