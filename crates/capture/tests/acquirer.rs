use capture::{
    AcquireError, AcquirePolicy, CameraAcquirer, CaptureDevice, CaptureError, DeviceOpener,
    ReplayOpener, DEFAULT_CAMERA_ORDER,
};
use image::RgbImage;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Opens,
    NotOpened,
    NoFrame,
    EmptyFrame,
    OpenError,
}

#[derive(Default)]
struct Log {
    opened: Vec<i32>,
    released: Vec<i32>,
    resolutions: Vec<(i32, u32, u32)>,
}

struct ScriptedOpener {
    behaviors: HashMap<i32, Behavior>,
    log: Rc<RefCell<Log>>,
    reject_resolution: bool,
}

impl ScriptedOpener {
    fn new(behaviors: &[(i32, Behavior)]) -> (Self, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        (
            Self {
                behaviors: behaviors.iter().copied().collect(),
                log: log.clone(),
                reject_resolution: false,
            },
            log,
        )
    }
}

impl DeviceOpener for ScriptedOpener {
    fn open(&mut self, index: i32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let behavior = self
            .behaviors
            .get(&index)
            .copied()
            .unwrap_or(Behavior::NotOpened);
        if let Behavior::OpenError = behavior {
            return Err(CaptureError::Open {
                index,
                reason: "scripted".into(),
            });
        }
        self.log.borrow_mut().opened.push(index);
        Ok(Box::new(ScriptedDevice {
            index,
            behavior,
            log: self.log.clone(),
            reject_resolution: self.reject_resolution,
        }))
    }
}

struct ScriptedDevice {
    index: i32,
    behavior: Behavior,
    log: Rc<RefCell<Log>>,
    reject_resolution: bool,
}

impl CaptureDevice for ScriptedDevice {
    fn index(&self) -> i32 {
        self.index
    }

    fn is_opened(&self) -> bool {
        !matches!(self.behavior, Behavior::NotOpened)
    }

    fn read(&mut self) -> Result<RgbImage, CaptureError> {
        match self.behavior {
            Behavior::Opens => Ok(RgbImage::new(8, 6)),
            Behavior::EmptyFrame => Ok(RgbImage::new(0, 0)),
            _ => Err(CaptureError::ReadFailed {
                index: self.index,
                reason: "scripted".into(),
            }),
        }
    }

    fn set_resolution(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
        self.log
            .borrow_mut()
            .resolutions
            .push((self.index, width, height));
        if self.reject_resolution {
            Err(CaptureError::Resolution {
                index: self.index,
                width,
                height,
                reason: "scripted".into(),
            })
        } else {
            Ok(())
        }
    }

    fn release(&mut self) {
        self.log.borrow_mut().released.push(self.index);
    }
}

#[test]
fn returns_no_camera_when_nothing_opens() {
    let (opener, log) = ScriptedOpener::new(&[]);
    let err = CameraAcquirer::new(opener)
        .acquire(&DEFAULT_CAMERA_ORDER, None)
        .unwrap_err();
    assert_eq!(
        err,
        AcquireError::NoCameraAvailable {
            tried: vec![1, 0, 2, 3]
        }
    );
    let log = log.borrow();
    assert_eq!(log.opened, log.released, "every opened device released");
}

#[test]
fn devices_that_open_but_cannot_read_are_rejected() {
    let (opener, log) = ScriptedOpener::new(&[
        (1, Behavior::NoFrame),
        (0, Behavior::EmptyFrame),
        (2, Behavior::OpenError),
    ]);
    let result = CameraAcquirer::new(opener).acquire(&DEFAULT_CAMERA_ORDER, Some((640, 480)));
    assert!(matches!(result, Err(AcquireError::NoCameraAvailable { .. })));
    assert_eq!(log.borrow().released, vec![1, 0, 3]);
    assert!(log.borrow().resolutions.is_empty());
}

#[test]
fn first_usable_in_priority_order_wins() {
    let (opener, log) = ScriptedOpener::new(&[
        (1, Behavior::NoFrame),
        (0, Behavior::Opens),
        (2, Behavior::Opens),
    ]);
    let mut handle = CameraAcquirer::new(opener)
        .acquire(&DEFAULT_CAMERA_ORDER, Some((640, 480)))
        .unwrap();
    assert_eq!(handle.index(), 0);
    assert_eq!(log.borrow().opened, vec![1, 0], "later candidates untouched");
    assert_eq!(log.borrow().released, vec![1]);
    assert_eq!(log.borrow().resolutions, vec![(0, 640, 480)]);

    let first = handle.read_frame().unwrap();
    let second = handle.read_frame().unwrap();
    assert_eq!((first.id, second.id), (0, 1));
    assert!(second.timestamp >= first.timestamp);

    handle.release();
    handle.release();
    drop(handle);
    assert_eq!(log.borrow().released, vec![1, 0], "released exactly once");
}

#[test]
fn drop_releases_the_camera() {
    let (opener, log) = ScriptedOpener::new(&[(1, Behavior::Opens)]);
    {
        let _handle = CameraAcquirer::new(opener)
            .acquire(&DEFAULT_CAMERA_ORDER, None)
            .unwrap();
        assert!(log.borrow().released.is_empty());
    }
    assert_eq!(log.borrow().released, vec![1]);
}

#[test]
fn resolution_failure_is_not_fatal() {
    let (mut opener, _log) = ScriptedOpener::new(&[(1, Behavior::Opens)]);
    opener.reject_resolution = true;
    let handle = CameraAcquirer::new(opener).acquire(&[1], Some((1920, 1080)));
    assert_eq!(handle.map(|h| h.index()), Ok(1));
}

#[test]
fn read_after_release_fails() {
    let (opener, _log) = ScriptedOpener::new(&[(1, Behavior::Opens)]);
    let mut handle = CameraAcquirer::new(opener).acquire(&[1], None).unwrap();
    handle.release();
    assert!(handle.is_released());
    assert!(matches!(
        handle.read_frame(),
        Err(CaptureError::NotOpened { index: 1 })
    ));
}

#[test]
fn prefer_external_picks_highest_usable_index() {
    let (opener, log) = ScriptedOpener::new(&[
        (0, Behavior::Opens),
        (1, Behavior::Opens),
        (2, Behavior::NotOpened),
    ]);
    let handle = CameraAcquirer::new(opener)
        .with_policy(AcquirePolicy::PreferExternal)
        .acquire(&[0, 1, 2], None)
        .unwrap();
    assert_eq!(handle.index(), 1);
    drop(handle);
    let log = log.borrow();
    assert_eq!(log.opened.len(), log.released.len());
}

#[test]
fn prefer_external_requires_two_cameras() {
    let (opener, log) = ScriptedOpener::new(&[(0, Behavior::Opens)]);
    let err = CameraAcquirer::new(opener)
        .with_policy(AcquirePolicy::PreferExternal)
        .acquire(&DEFAULT_CAMERA_ORDER, None)
        .unwrap_err();
    assert_eq!(err, AcquireError::NoCameraAvailable { tried: vec![0, 1] });
    let log = log.borrow();
    assert_eq!(log.opened, log.released);
}

#[test]
fn prefer_external_stops_scanning_at_first_gap() {
    let (opener, log) = ScriptedOpener::new(&[
        (0, Behavior::Opens),
        (1, Behavior::Opens),
        (2, Behavior::NoFrame),
        (3, Behavior::Opens),
    ]);
    let handle = CameraAcquirer::new(opener)
        .with_policy(AcquirePolicy::PreferExternal)
        .acquire(&DEFAULT_CAMERA_ORDER, None)
        .unwrap();
    assert_eq!(handle.index(), 1);
    drop(handle);
    let log = log.borrow();
    assert!(!log.opened.contains(&3));
    assert_eq!(log.opened.len(), log.released.len());
}

#[test]
fn prefer_external_with_gap_at_one_has_no_external() {
    let (opener, _log) = ScriptedOpener::new(&[(0, Behavior::Opens), (2, Behavior::Opens)]);
    let err = CameraAcquirer::new(opener)
        .with_policy(AcquirePolicy::PreferExternal)
        .acquire(&[0, 1, 2], None)
        .unwrap_err();
    assert_eq!(err, AcquireError::NoCameraAvailable { tried: vec![0, 1] });
}

#[test]
fn scan_stops_at_first_gap() {
    let (opener, log) = ScriptedOpener::new(&[
        (0, Behavior::Opens),
        (1, Behavior::Opens),
        (3, Behavior::Opens),
    ]);
    let found = CameraAcquirer::new(opener).scan(5);
    assert_eq!(found, vec![0, 1]);
    let log = log.borrow();
    assert_eq!(log.opened, log.released);
}

#[test]
fn replay_source_acts_as_camera_zero() {
    let opener = ReplayOpener::from_images(0, vec![RgbImage::new(16, 12)]);
    let mut handle = CameraAcquirer::new(opener)
        .acquire(&DEFAULT_CAMERA_ORDER, Some((8, 6)))
        .unwrap();
    assert_eq!(handle.index(), 0);
    assert_eq!(handle.read_frame().unwrap().size(), (8, 6));
}

#[test]
fn replay_delivers_every_frame_after_acquisition() {
    let frames = (0u8..3)
        .map(|v| RgbImage::from_pixel(4, 4, image::Rgb([v, v, v])))
        .collect();
    let opener = ReplayOpener::from_images(0, frames).once();
    let mut handle = CameraAcquirer::new(opener)
        .acquire(&DEFAULT_CAMERA_ORDER, None)
        .unwrap();
    let mut seen = Vec::new();
    while let Ok(frame) = handle.read_frame() {
        seen.push(frame.image.get_pixel(0, 0)[0]);
    }
    assert_eq!(seen, vec![0, 1, 2]);
}

#[test]
fn read_frame_at_uses_the_given_timestamp() {
    let opener = ReplayOpener::from_images(0, vec![RgbImage::new(4, 4)]);
    let mut handle = CameraAcquirer::new(opener)
        .acquire(&DEFAULT_CAMERA_ORDER, None)
        .unwrap();
    let frame = handle.read_frame_at(12.5).unwrap();
    assert_eq!((frame.id, frame.timestamp), (0, 12.5));
}
