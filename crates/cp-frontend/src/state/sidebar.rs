//! Right sidebar state

/// Menus reachable from the sidebar button column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarMenu {
    /// Geometric dimensioning and tolerancing
    Gdt,
    /// Feature-based machining
    Fbm,
    /// Computer-aided engineering
    Cae,
}

impl SidebarMenu {
    /// All menus in display order
    pub const ALL: [SidebarMenu; 3] = [SidebarMenu::Gdt, SidebarMenu::Fbm, SidebarMenu::Cae];

    /// Button and window title
    pub fn label(&self) -> &'static str {
        match self {
            SidebarMenu::Gdt => "GD&T",
            SidebarMenu::Fbm => "FBM",
            SidebarMenu::Cae => "CAE",
        }
    }
}

/// Open/closed flags of the sidebar and its menus
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidebarState {
    pub open: bool,
    pub gdt_open: bool,
    pub fbm_open: bool,
    pub cae_open: bool,
}

impl SidebarState {
    /// Open or close the sidebar
    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    /// Open or close one menu window
    pub fn toggle_menu(&mut self, menu: SidebarMenu) {
        let flag = self.menu_open_mut(menu);
        *flag = !*flag;
    }

    /// Check if a menu window is open
    pub fn is_menu_open(&self, menu: SidebarMenu) -> bool {
        match menu {
            SidebarMenu::Gdt => self.gdt_open,
            SidebarMenu::Fbm => self.fbm_open,
            SidebarMenu::Cae => self.cae_open,
        }
    }

    /// Mutable flag for a menu window
    pub fn menu_open_mut(&mut self, menu: SidebarMenu) -> &mut bool {
        match menu {
            SidebarMenu::Gdt => &mut self.gdt_open,
            SidebarMenu::Fbm => &mut self.fbm_open,
            SidebarMenu::Cae => &mut self.cae_open,
        }
    }
}
