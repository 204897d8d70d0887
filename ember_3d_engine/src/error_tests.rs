use crate::error::Error;

#[test]
fn test_display_backend_error() {
    let err = Error::BackendError("queue submit failed".to_string());
    assert_eq!(format!("{}", err), "Backend error: queue submit failed");
}

#[test]
fn test_display_out_of_memory() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_display_invalid_resource() {
    let err = Error::InvalidResource("stale image key".to_string());
    assert_eq!(format!("{}", err), "Invalid resource: stale image key");
}

#[test]
fn test_display_initialization_failed() {
    let err = Error::InitializationFailed("no suitable GPU".to_string());
    assert_eq!(format!("{}", err), "Initialization failed: no suitable GPU");
}

#[test]
fn test_display_resource_load_failed() {
    let err = Error::ResourceLoadFailed("shaders/deferred.vert.spv".to_string());
    assert_eq!(
        format!("{}", err),
        "Resource load failed: shaders/deferred.vert.spv"
    );
}

#[test]
fn test_error_is_std_error() {
    fn assert_std_error<E: std::error::Error>(_: &E) {}
    assert_std_error(&Error::OutOfMemory);
}

#[test]
fn test_error_is_clone() {
    let err = Error::BackendError("original".to_string());
    let cloned = err.clone();
    assert_eq!(format!("{}", err), format!("{}", cloned));
}
