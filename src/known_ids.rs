//! Well-known identifier tables: known folders, shell namespace objects,
//! Control Panel categories and jump list application ids.

use crate::guid::GuidNames;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Shell namespace object that heads Control Panel category paths
pub const CONTROL_PANEL_ROOT: &str = "26ee0668-a00a-44d7-9371-beb064c98683";

/// KNOWNFOLDERID values
const KNOWN_FOLDERS: &[(&str, &str)] = &[
    ("18989b1d-99b5-455b-841c-ab7c74e4ddfc", "Videos"),
    ("33e28130-4e1e-4676-835a-98395c3bc3bb", "Pictures"),
    ("4bd8d571-6d19-48d3-be97-422220080e43", "Music"),
    ("fdd39ad0-238f-46af-adb4-6c85480369c7", "Documents"),
    ("374de290-123f-4565-9164-39c4925e467b", "Downloads"),
    ("b4bfcc3a-db2c-424c-b029-7fe99a87c641", "Desktop"),
    ("1777f761-68ad-4d8a-87bd-30b759fa33dd", "Favorites"),
    ("bfb9d5e0-c6a9-404c-b2b2-ae6db6af4968", "Links"),
    ("56784854-c6cb-462b-8169-88e350acb882", "Contacts"),
    ("4c5c32ff-bb9d-43b0-b5b4-2d72e54eaaa4", "Saved Games"),
    ("7d1d3a04-debb-4115-95cf-2f29da2920da", "Searches"),
    ("5e6c858f-0e22-4760-9afe-ea3317b67173", "User Profile"),
    ("0762d272-c50a-4bb0-a382-697dcd729b80", "Users"),
    ("dfdf76a2-c82a-4d63-906a-5644ac457385", "Public"),
    ("905e63b6-c1bf-494e-b29c-65b732d3d21a", "Program Files"),
    ("7c5a40ef-a0fb-4bfc-874a-c0f2e0b9fa8e", "Program Files (x86)"),
    ("62ab5d82-fdc1-4dc3-a9dd-070d1d495d97", "ProgramData"),
    ("f38bf404-1d43-42f2-9305-67de0b28fc23", "Windows"),
    ("1ac14e77-02e7-4e5d-b744-2eb1ae5198b7", "System32"),
    ("d65231b0-b2f1-4857-a4ce-a8e7c6ea7d27", "SysWOW64"),
    ("3eb685db-65f9-4cf6-a03a-e3ef65729f3d", "AppData\\Roaming"),
    ("f1b32785-6fba-4fcf-9d55-7b8e7f157091", "AppData\\Local"),
    ("a520a1a4-1780-4ff6-bd18-167343c5af16", "AppData\\LocalLow"),
    ("ae50c081-ebd2-438a-8655-8a092e34987a", "Recent Items"),
    ("a63293e8-664e-48db-a079-df759e0509f7", "Templates"),
    ("8983036c-27c0-404b-8f08-102d10dcfd74", "SendTo"),
    ("625b53c3-ab48-4ec1-ba1f-a1ef4146fc19", "Start Menu"),
    ("a77f5d77-2e2b-44c3-a6a2-aba601054a51", "Programs"),
    ("b97d20bb-f46a-4c97-ba10-5e3608430854", "Startup"),
    ("1b3ea5dc-b587-4786-b4ef-bd1dc332aeae", "Libraries"),
    ("7b0db17d-9cd2-4a93-9733-46cc89022e7c", "Documents Library"),
    ("2112ab0a-c86a-4ffe-a368-0de96e47012e", "Music Library"),
    ("a990ae9f-a03b-4e80-94bc-9912d7504104", "Pictures Library"),
    ("491e922f-5643-4af4-a7eb-4e7a138d8174", "Videos Library"),
    ("a4115719-d62e-491d-aa7c-e74b8be3b067", "Start Menu (All Users)"),
    ("a305ce99-f527-492b-8b1a-7e76fa98d6e4", "Installed Updates"),
    ("de974d24-d9c6-4d3e-bf91-f4455120b917", "Common Files"),
    ("a52bba46-e9e1-435f-b3d9-28daa648c0f6", "OneDrive"),
    ("b7bede81-df94-4682-a7d8-57a52620b86f", "Screenshots"),
    ("ab5fb87b-7ce2-4f83-915d-550846c9537b", "Camera Roll"),
];

/// Shell namespace CLSIDs that appear as `::{...}` path segments
const SHELL_FOLDERS: &[(&str, &str)] = &[
    ("20d04fe0-3aea-1069-a2d8-08002b30309d", "This PC"),
    ("031e4825-7b94-4dc3-b131-e946b44c8dd5", "Libraries"),
    ("59031a47-3f72-44a7-89c5-5595fe6b30ee", "User Files"),
    ("645ff040-5081-101b-9f08-00aa002f954e", "Recycle Bin"),
    ("208d2c60-3aea-1069-a2d7-08002b30309d", "Network Places"),
    ("f02c1a0d-be21-4350-88b0-7367fc96ef3c", "Network"),
    (CONTROL_PANEL_ROOT, "Control Panel"),
    ("21ec2020-3aea-1069-a2dd-08002b30309d", "All Control Panel Items"),
    ("679f85cb-0220-4080-b29b-5540cc05aab6", "Quick Access"),
    ("22877a6d-37a1-461a-91b0-dbda5aaebc99", "Recent Places"),
    ("450d8fba-ad25-11d0-98a8-0800361b1103", "My Documents"),
    ("871c5380-42a0-1069-a2ea-08002b30309d", "Internet Explorer"),
    ("3080f90d-d7ad-11d9-bd98-0000947b0257", "Show Desktop"),
    ("3080f90e-d7ad-11d9-bd98-0000947b0257", "Window Switcher"),
    ("4234d49b-0245-4df3-b780-3893943456e1", "Applications"),
    ("018d5c66-4533-4307-9b53-224de2ed1fe6", "OneDrive"),
    ("2227a280-3aea-1069-a2de-08002b30309d", "Printers"),
    ("7007acc7-3202-11d1-aad2-00805fc1270e", "Network Connections"),
    ("d20ea4e1-3957-11d2-a40b-0c5020524153", "Administrative Tools"),
    ("ed228fdf-9ea8-4870-83b1-96b02cfe0d52", "Games"),
];

/// Well-known jump list application ids (the filename stem)
const APP_IDS: &[(&str, &str)] = &[
    ("1b4dd67f29cb1962", "Windows Explorer Pinned and Recent"),
    ("5f7b5f1e01b83767", "Windows Explorer Quick Access"),
    ("f01b4d95cf55d32a", "Windows Explorer (Windows 8.1/10)"),
    ("7e4dca80246863e3", "Control Panel"),
    ("9b9cdc69c1c24e2b", "Notepad (64-bit)"),
    ("918e0ecb43d17e23", "Notepad (32-bit)"),
    ("12dc1ea8e34b5a6", "Microsoft Paint 6.1"),
    ("1bc392b8e104a00e", "Remote Desktop Connection"),
    ("28c8b86deab549a1", "Internet Explorer 8/9/10"),
    ("5d696d521de238c3", "Google Chrome"),
    ("5df4765359170e26", "Mozilla Firefox"),
    ("9fda41b86ddcf1db", "VLC Media Player"),
    ("9839aec31243a928", "Microsoft Office Excel 2010"),
    ("a7bd71699cd38d1c", "Microsoft Office Word 2010"),
    ("d00655d2aa12ff6d", "Microsoft Office PowerPoint 2010"),
    ("b91050d8b077a4e8", "Windows Media Center"),
    ("290532160612e071", "WinRAR"),
    ("e70d383b15687e37", "Notepad++"),
    ("6e855c85de07bc6a", "Microsoft Office Excel 2010 (64-bit)"),
    ("ee462c3b81abb6f6", "Adobe Reader X"),
];

/// Control Panel category codes
const CONTROL_PANEL_CATEGORIES: &[(u8, &str)] = &[
    (0x00, "All Control Panel Items"),
    (0x01, "Appearance and Personalization"),
    (0x02, "Hardware and Sound"),
    (0x03, "Network and Internet"),
    (0x04, "Sounds, Speech, and Audio Devices"),
    (0x05, "System and Security"),
    (0x06, "Clock, Language, and Region"),
    (0x07, "Ease of Access"),
    (0x08, "Programs"),
    (0x09, "User Accounts"),
    (0x10, "Security Center"),
    (0x11, "Mobile PC"),
];

/// Known folders and shell namespace objects in one table
pub fn known_guids() -> &'static GuidNames {
    static TABLE: OnceLock<GuidNames> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = GuidNames::from_entries(KNOWN_FOLDERS);
        for (guid, name) in SHELL_FOLDERS {
            table.insert(guid, *name);
        }
        table
    })
}

/// Application name for a jump list app id (case-insensitive)
pub fn app_name(app_id: &str) -> Option<&'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    let table = TABLE.get_or_init(|| APP_IDS.iter().copied().collect());
    table.get(app_id.to_ascii_lowercase().as_str()).copied()
}

pub fn control_panel_category(code: u8) -> Option<&'static str> {
    CONTROL_PANEL_CATEGORIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}
