//! Wire enumerations
//!
//! Every enumeration lists its neutral seed first: prost uses the first
//! variant as `Default`, and the status baseline starts from defaults.

/// Container message type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    Ping = 1,
    PingAcknowledge = 2,
    Error = 3,

    FullUpdate = 10,
    IncrementalUpdate = 11,

    NmlError = 20,
    NmlText = 21,
    NmlDisplay = 22,
    OperatorError = 23,
    OperatorText = 24,
    OperatorDisplay = 25,

    TaskAbort = 100,
    TaskPlanPause = 101,
    TaskPlanResume = 102,
    TaskPlanStep = 103,
    TaskPlanRun = 104,
    TaskPlanOpen = 105,
    TaskPlanExecute = 106,
    TaskPlanInit = 107,
    TaskSetMode = 108,
    TaskSetState = 109,
    TaskPlanSetBlockDelete = 110,
    TaskPlanSetOptionalStop = 111,

    TrajSetMode = 120,
    TrajSetScale = 121,
    TrajSetSpindleScale = 122,
    TrajSetMaxVelocity = 123,
    TrajSetFeedHoldEnable = 124,
    TrajSetFeedOverrideEnable = 125,
    TrajSetSpindleOverrideEnable = 126,
    TrajSetTeleopEnable = 127,
    TrajSetTeleopVector = 128,

    AxisHome = 140,
    AxisUnhome = 141,
    AxisAbort = 142,
    AxisJog = 143,
    AxisIncrJog = 144,
    AxisOverrideLimits = 145,
    AxisSetMaxPositionLimit = 146,
    AxisSetMinPositionLimit = 147,

    SpindleOn = 160,
    SpindleOff = 161,
    SpindleIncrease = 162,
    SpindleDecrease = 163,
    SpindleConstant = 164,
    SpindleBrakeEngage = 165,
    SpindleBrakeRelease = 166,

    CoolantFloodOn = 180,
    CoolantFloodOff = 181,
    CoolantMistOn = 182,
    CoolantMistOff = 183,

    MotionAdaptive = 190,
    MotionSetDigitalOutput = 191,
    MotionSetAnalogOutput = 192,
    SetDebug = 193,

    ToolLoadToolTable = 200,
    ToolSetOffset = 201,
}

impl MessageType {
    /// Topic an error-channel message is published on
    pub fn error_topic(self) -> Option<&'static str> {
        match self {
            MessageType::NmlError | MessageType::OperatorError => Some("error"),
            MessageType::NmlText | MessageType::OperatorText => Some("text"),
            MessageType::NmlDisplay | MessageType::OperatorDisplay => Some("display"),
            _ => None,
        }
    }
}

/// Operating mode of the task controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TaskMode {
    Manual = 1,
    Auto = 2,
    Mdi = 3,
}

/// Machine power/estop state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TaskState {
    Estop = 1,
    EstopReset = 2,
    Off = 3,
    On = 4,
}

/// What the task executor is currently waiting on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ExecState {
    Error = 1,
    Done = 2,
    WaitingForMotion = 3,
    WaitingForMotionQueue = 4,
    WaitingForIo = 5,
    WaitingForMotionAndIo = 7,
    WaitingForDelay = 8,
    WaitingForSystemCmd = 9,
    WaitingForSpindleOrient = 10,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum InterpState {
    Idle = 1,
    Reading = 2,
    Paused = 3,
    Waiting = 4,
}

/// Trajectory planner mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TrajMode {
    Free = 1,
    Coord = 2,
    Teleop = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MotionState {
    Uninitialized = -1,
    Done = 1,
    Exec = 2,
    Error = 3,
    Received = 4,
}

/// Kind of move currently executing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MotionType {
    Unset = 0,
    Traverse = 1,
    Feed = 2,
    Arc = 3,
    Toolchange = 4,
    Probing = 5,
    IndexRotary = 6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AxisType {
    Linear = 1,
    Angular = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum KinematicsType {
    Identity = 1,
    ForwardOnly = 2,
    InverseOnly = 3,
    Both = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CanonUnits {
    Inches = 1,
    Mm = 2,
    Cm = 3,
}

/// Whether displayed positions are relative to the active offsets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PositionOffset {
    Relative = 1,
    Machine = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PositionFeedback {
    Actual = 1,
    Commanded = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TimeUnits {
    Minute = 0,
    Second = 1,
}

/// Active work coordinate system
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OriginIndex {
    G54 = 1,
    G55 = 2,
    G56 = 3,
    G57 = 4,
    G58 = 5,
    G59 = 6,
    G591 = 7,
    G592 = 8,
    G593 = 9,
}
