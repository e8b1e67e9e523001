fn main() {
    // Only the ESP-IDF binary needs the toolchain environment.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
