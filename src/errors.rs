// Create the Error, ErrorKind, ResultExt, and Result types.
// Only contract violations by the caller end up here: infeasible splits, doors without a valid span
// and unreachable targets are all handled without raising an error.
error_chain! {

    errors {
        InvalidDimensions(width: usize, height: usize, minimum_room_size: usize) {
            description("dungeon dimensions too small")
            display("a {}x{} dungeon cannot hold a single room of minimum size {}",
                    width, height, minimum_room_size)
        }
        InvalidMinimumRoomSize(minimum_room_size: usize) {
            description("invalid minimum room size")
            display("minimum room size must be greater than zero, got {}", minimum_room_size)
        }
        MinimumRoomSizeTooLarge(minimum_room_size: usize, width: usize, height: usize) {
            description("minimum room size too large")
            display("minimum room size {} never allows a {}x{} dungeon to be divided",
                    minimum_room_size, width, height)
        }
        UnknownNode(id: usize) {
            description("node is not part of the graph")
            display("node {} is not part of the navigation graph", id)
        }
        UnknownRoom(id: usize) {
            description("room is not part of the dungeon")
            display("room {} is not part of the dungeon", id)
        }
        UnknownDoor(id: usize) {
            description("door is not part of the dungeon")
            display("door {} is not part of the dungeon", id)
        }
        UnknownHallway(id: usize) {
            description("hallway is not part of the dungeon")
            display("hallway {} is not part of the dungeon", id)
        }
        EmptyGraph {
            description("navigation graph has no enabled nodes")
            display("the navigation graph has no enabled node to place an agent on")
        }
        ParseSetting(setting: &'static str, value: String) {
            description("unrecognised setting value")
            display("'{}' is not a valid {}", value, setting)
        }
    }
}
